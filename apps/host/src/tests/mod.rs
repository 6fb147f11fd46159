mod error;
mod logger;
mod startup;
