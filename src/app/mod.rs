pub mod ml_pipeline;
pub mod scrape_job;
