
mod api_tests;
mod pipeline_tests;
