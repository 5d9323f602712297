mod cache;
mod connectors;
mod gateway;
