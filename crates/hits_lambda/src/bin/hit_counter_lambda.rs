use aws_sdk_dynamodb::types::AttributeValue;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use hits_core::config::resolve_runtime_config;
use hits_core::contract::ApiGatewayResponse;
use hits_lambda::adapters::hit_store::HitStore;
use hits_lambda::handlers::hit_count::handle_hit_request;

struct DynamoHitStore {
    table_name: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
}

impl HitStore for DynamoHitStore {
    fn increment_hits(&self, path: &str) -> Result<(), String> {
        let table_name = self.table_name.clone();
        let path_key = path.to_string();
        let client = self.dynamodb_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .update_item()
                    .table_name(table_name)
                    .key("path", AttributeValue::S(path_key))
                    .update_expression("ADD hits :incr")
                    .expression_attribute_values(":incr", AttributeValue::N("1".to_string()))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to update hit counter item: {error}"))
            })
        })
    }

    fn read_hits(&self, path: &str) -> Result<Option<u64>, String> {
        let table_name = self.table_name.clone();
        let path_key = path.to_string();
        let client = self.dynamodb_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_item()
                    .table_name(table_name)
                    .key("path", AttributeValue::S(path_key))
                    .send()
                    .await
                    .map_err(|error| format!("failed to read hit counter item: {error}"))?;

                let Some(hits) = output.item().and_then(|item| item.get("hits")) else {
                    return Ok(None);
                };

                hits.as_n()
                    .map_err(|_| "hits attribute is not numeric".to_string())?
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|error| format!("hits attribute is not a valid count: {error}"))
            })
        })
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    store: &DynamoHitStore,
) -> Result<ApiGatewayResponse, Error> {
    handle_hit_request(&event.payload, store).map_err(|error| Error::from(error.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Both variables are required; refusing to start beats serving requests
    // that cannot reach the table.
    let config = resolve_runtime_config(
        std::env::var("HITS_TABLE_NAME").ok(),
        std::env::var("REGION").ok(),
    )
    .map_err(|error| Error::from(error.message().to_string()))?;

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region))
        .load()
        .await;
    let store = DynamoHitStore {
        table_name: config.table_name,
        dynamodb_client: aws_sdk_dynamodb::Client::new(&aws_config),
    };
    let store_ref = &store;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, store_ref).await
    }))
    .await
}
