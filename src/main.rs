//! Insights Aggregator Service
//!
//! Main entry point for the insights aggregator

use insights_aggregator::InsightsBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Start the complete service with all defaults and setup handled automatically
	InsightsBuilder::new().start_service().await
}
