mod api_tests;
mod gateway_tests;
mod media_tests;
