mod candidate_builder;
