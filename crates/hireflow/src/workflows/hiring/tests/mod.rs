mod agent;
mod common;
