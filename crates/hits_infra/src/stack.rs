use serde_json::json;

use hits_core::contract::ValidationError;

use crate::template::{attribute, reference, substitution, Resource, Template};

/// Every CloudFront alias record resolves through this fixed hosted zone.
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// The CachingOptimized managed cache policy.
pub const CACHING_OPTIMIZED_CACHE_POLICY_ID: &str = "658327ea-f89d-4fab-a63d-7e88639e58f6";

pub const DEFAULT_ARTIFACT_KEY: &str = "dist/hit_counter_lambda.zip";

const SITE_ORIGIN_ID: &str = "site-bucket-origin";

/// Action set granted to the counter function on the hits table.
pub const TABLE_READ_WRITE_ACTIONS: [&str; 10] = [
    "dynamodb:BatchGetItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
    "dynamodb:GetItem",
    "dynamodb:PutItem",
    "dynamodb:Query",
    "dynamodb:Scan",
    "dynamodb:UpdateItem",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomDomain {
    pub domain_name: String,
    pub certificate_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackParams {
    pub artifact_bucket: String,
    pub artifact_key: String,
    pub custom_domain: Option<CustomDomain>,
}

/// Resolve synth inputs from their environment values.
///
/// The artifact bucket is required. Domain name and certificate come as a
/// pair; providing only one of them is a misconfiguration, not a partial
/// deployment.
pub fn resolve_stack_params(
    artifact_bucket: Option<String>,
    artifact_key: Option<String>,
    domain_name: Option<String>,
    certificate_arn: Option<String>,
) -> Result<StackParams, ValidationError> {
    let artifact_bucket = non_empty(artifact_bucket)
        .ok_or_else(|| ValidationError::new("LAMBDA_ARTIFACT_BUCKET must be configured"))?;
    let artifact_key =
        non_empty(artifact_key).unwrap_or_else(|| DEFAULT_ARTIFACT_KEY.to_string());

    let custom_domain = match (non_empty(domain_name), non_empty(certificate_arn)) {
        (Some(domain_name), Some(certificate_arn)) => Some(CustomDomain {
            domain_name,
            certificate_arn,
        }),
        (None, None) => None,
        (Some(_), None) => {
            return Err(ValidationError::new(
                "AWS_CERTIFICATE_ARN must be configured when AWS_DOMAIN_NAME is set",
            ));
        }
        (None, Some(_)) => {
            return Err(ValidationError::new(
                "AWS_DOMAIN_NAME must be configured when AWS_CERTIFICATE_ARN is set",
            ));
        }
    };

    Ok(StackParams {
        artifact_bucket,
        artifact_key,
        custom_domain,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

pub fn synthesize_stack(params: &StackParams) -> Template {
    let mut template = Template::new(
        "Hit-counter webservice: site bucket behind CloudFront, \
         DynamoDB-backed counter function behind an HTTP API",
    );

    template.add_resource("SiteBucket", site_bucket());
    template.add_resource("SiteOriginAccessControl", site_origin_access_control());
    template.add_resource(
        "SiteDistribution",
        site_distribution(params.custom_domain.as_ref()),
    );
    template.add_resource("SiteBucketPolicy", site_bucket_policy());
    template.add_resource("HitsTable", hits_table());
    template.add_resource("HitCounterRole", hit_counter_role());
    template.add_resource("HitCounterFunction", hit_counter_function(params));
    template.add_resource("HttpApi", http_api());
    template.add_resource("HttpApiIntegration", http_api_integration());
    template.add_resource("HttpApiDefaultRoute", http_api_default_route());
    template.add_resource("HttpApiDefaultStage", http_api_default_stage());
    template.add_resource("HttpApiInvokePermission", http_api_invoke_permission());

    if let Some(domain) = params.custom_domain.as_ref() {
        template.add_resource("SiteAliasRecord", dns_alias_record(domain, "A"));
        template.add_resource("SiteAliasRecordIpv6", dns_alias_record(domain, "AAAA"));
    }

    template.add_output("ApiUrl", "HTTP API Url", attribute("HttpApi", "ApiEndpoint"));
    template.add_output(
        "CloudFrontDomain",
        "Cloudfront Domain",
        attribute("SiteDistribution", "DomainName"),
    );
    template.add_output(
        "SiteBucketName",
        "Bucket holding the static site content",
        reference("SiteBucket"),
    );

    template
}

fn site_bucket() -> Resource {
    Resource::new(
        "AWS::S3::Bucket",
        json!({
            "VersioningConfiguration": { "Status": "Enabled" },
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                ]
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            }
        }),
    )
    .with_deletion_policy("Delete")
}

fn site_origin_access_control() -> Resource {
    Resource::new(
        "AWS::CloudFront::OriginAccessControl",
        json!({
            "OriginAccessControlConfig": {
                "Name": substitution("${AWS::StackName}-site-oac"),
                "OriginAccessControlOriginType": "s3",
                "SigningBehavior": "always",
                "SigningProtocol": "sigv4"
            }
        }),
    )
}

fn site_distribution(custom_domain: Option<&CustomDomain>) -> Resource {
    let mut config = json!({
        "Enabled": true,
        "DefaultRootObject": "index.html",
        "PriceClass": "PriceClass_100",
        "Origins": [
            {
                "Id": SITE_ORIGIN_ID,
                "DomainName": attribute("SiteBucket", "RegionalDomainName"),
                "OriginAccessControlId": attribute("SiteOriginAccessControl", "Id"),
                "S3OriginConfig": { "OriginAccessIdentity": "" }
            }
        ],
        "DefaultCacheBehavior": {
            "TargetOriginId": SITE_ORIGIN_ID,
            "ViewerProtocolPolicy": "redirect-to-https",
            "CachePolicyId": CACHING_OPTIMIZED_CACHE_POLICY_ID
        }
    });

    if let Some(domain) = custom_domain {
        config["Aliases"] = json!([domain.domain_name]);
        config["ViewerCertificate"] = json!({
            "AcmCertificateArn": domain.certificate_arn,
            "SslSupportMethod": "sni-only",
            "MinimumProtocolVersion": "TLSv1.2_2021"
        });
    }

    Resource::new(
        "AWS::CloudFront::Distribution",
        json!({ "DistributionConfig": config }),
    )
}

fn site_bucket_policy() -> Resource {
    Resource::new(
        "AWS::S3::BucketPolicy",
        json!({
            "Bucket": reference("SiteBucket"),
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Sid": "AllowCloudFrontServicePrincipal",
                        "Effect": "Allow",
                        "Principal": { "Service": "cloudfront.amazonaws.com" },
                        "Action": "s3:GetObject",
                        "Resource": substitution("${SiteBucket.Arn}/*"),
                        "Condition": {
                            "StringEquals": {
                                "AWS:SourceArn": substitution(
                                    "arn:${AWS::Partition}:cloudfront::${AWS::AccountId}:distribution/${SiteDistribution}"
                                )
                            }
                        }
                    }
                ]
            }
        }),
    )
}

fn hits_table() -> Resource {
    Resource::new(
        "AWS::DynamoDB::Table",
        json!({
            "AttributeDefinitions": [
                { "AttributeName": "path", "AttributeType": "S" }
            ],
            "KeySchema": [
                { "AttributeName": "path", "KeyType": "HASH" }
            ],
            "BillingMode": "PAY_PER_REQUEST"
        }),
    )
}

fn hit_counter_role() -> Resource {
    Resource::new(
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                        "Action": "sts:AssumeRole"
                    }
                ]
            },
            "ManagedPolicyArns": [
                substitution(
                    "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"
                )
            ],
            "Policies": [
                {
                    "PolicyName": "hits-table-read-write",
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Effect": "Allow",
                                "Action": TABLE_READ_WRITE_ACTIONS,
                                "Resource": attribute("HitsTable", "Arn")
                            }
                        ]
                    }
                }
            ]
        }),
    )
}

fn hit_counter_function(params: &StackParams) -> Resource {
    Resource::new(
        "AWS::Lambda::Function",
        json!({
            "Architectures": ["arm64"],
            "Runtime": "provided.al2023",
            "Handler": "bootstrap",
            "MemorySize": 1024,
            "Code": {
                "S3Bucket": params.artifact_bucket,
                "S3Key": params.artifact_key
            },
            "Role": attribute("HitCounterRole", "Arn"),
            "Environment": {
                "Variables": {
                    "HITS_TABLE_NAME": reference("HitsTable"),
                    "REGION": reference("AWS::Region")
                }
            }
        }),
    )
}

fn http_api() -> Resource {
    Resource::new(
        "AWS::ApiGatewayV2::Api",
        json!({
            "Name": substitution("${AWS::StackName}-hit-counter-api"),
            "ProtocolType": "HTTP",
            "CorsConfiguration": {
                "AllowMethods": ["GET"],
                "AllowOrigins": [substitution("https://${SiteDistribution.DomainName}")]
            }
        }),
    )
}

fn http_api_integration() -> Resource {
    Resource::new(
        "AWS::ApiGatewayV2::Integration",
        json!({
            "ApiId": reference("HttpApi"),
            "IntegrationType": "AWS_PROXY",
            "IntegrationUri": attribute("HitCounterFunction", "Arn"),
            "PayloadFormatVersion": "2.0"
        }),
    )
}

fn http_api_default_route() -> Resource {
    Resource::new(
        "AWS::ApiGatewayV2::Route",
        json!({
            "ApiId": reference("HttpApi"),
            "RouteKey": "$default",
            "Target": substitution("integrations/${HttpApiIntegration}")
        }),
    )
}

fn http_api_default_stage() -> Resource {
    Resource::new(
        "AWS::ApiGatewayV2::Stage",
        json!({
            "ApiId": reference("HttpApi"),
            "StageName": "$default",
            "AutoDeploy": true
        }),
    )
}

fn http_api_invoke_permission() -> Resource {
    Resource::new(
        "AWS::Lambda::Permission",
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": reference("HitCounterFunction"),
            "Principal": "apigateway.amazonaws.com",
            "SourceArn": substitution(
                "arn:${AWS::Partition}:execute-api:${AWS::Region}:${AWS::AccountId}:${HttpApi}/*"
            )
        }),
    )
}

fn dns_alias_record(domain: &CustomDomain, record_type: &str) -> Resource {
    Resource::new(
        "AWS::Route53::RecordSet",
        json!({
            "Name": domain.domain_name,
            "Type": record_type,
            "HostedZoneName": format!("{}.", domain.domain_name),
            "AliasTarget": {
                "DNSName": attribute("SiteDistribution", "DomainName"),
                "HostedZoneId": CLOUDFRONT_HOSTED_ZONE_ID
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_params() -> StackParams {
        StackParams {
            artifact_bucket: "artifact-bucket".to_string(),
            artifact_key: "dist/hit_counter_lambda.zip".to_string(),
            custom_domain: None,
        }
    }

    fn sample_params_with_domain() -> StackParams {
        StackParams {
            custom_domain: Some(CustomDomain {
                domain_name: "hits.example.com".to_string(),
                certificate_arn: "arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string(),
            }),
            ..sample_params()
        }
    }

    #[test]
    fn resolves_params_with_defaulted_artifact_key() {
        let params = resolve_stack_params(
            Some("artifact-bucket".to_string()),
            None,
            None,
            None,
        )
        .expect("params should resolve");

        assert_eq!(params.artifact_key, DEFAULT_ARTIFACT_KEY);
        assert_eq!(params.custom_domain, None);
    }

    #[test]
    fn rejects_missing_artifact_bucket() {
        let error = resolve_stack_params(Some("  ".to_string()), None, None, None)
            .expect_err("params should fail");
        assert_eq!(error.message(), "LAMBDA_ARTIFACT_BUCKET must be configured");
    }

    #[test]
    fn rejects_domain_without_certificate() {
        let error = resolve_stack_params(
            Some("artifact-bucket".to_string()),
            None,
            Some("hits.example.com".to_string()),
            None,
        )
        .expect_err("params should fail");
        assert!(error.message().contains("AWS_CERTIFICATE_ARN"));
    }

    #[test]
    fn rejects_certificate_without_domain() {
        let error = resolve_stack_params(
            Some("artifact-bucket".to_string()),
            None,
            None,
            Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".to_string()),
        )
        .expect_err("params should fail");
        assert!(error.message().contains("AWS_DOMAIN_NAME"));
    }

    #[test]
    fn table_is_keyed_solely_by_path_string() {
        let template = synthesize_stack(&sample_params());
        let table = &template.resources["HitsTable"];

        assert_eq!(table.resource_type, "AWS::DynamoDB::Table");
        assert_eq!(
            table.properties["AttributeDefinitions"],
            json!([{ "AttributeName": "path", "AttributeType": "S" }])
        );
        assert_eq!(
            table.properties["KeySchema"],
            json!([{ "AttributeName": "path", "KeyType": "HASH" }])
        );
    }

    #[test]
    fn site_bucket_is_versioned_encrypted_and_blocked() {
        let template = synthesize_stack(&sample_params());
        let bucket = &template.resources["SiteBucket"];

        assert_eq!(bucket.deletion_policy.as_deref(), Some("Delete"));
        assert_eq!(
            bucket.properties["VersioningConfiguration"]["Status"],
            json!("Enabled")
        );
        assert_eq!(
            bucket.properties["BucketEncryption"]["ServerSideEncryptionConfiguration"][0]
                ["ServerSideEncryptionByDefault"]["SSEAlgorithm"],
            json!("AES256")
        );
        assert_eq!(
            bucket.properties["PublicAccessBlockConfiguration"],
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            })
        );
    }

    #[test]
    fn cors_allows_only_get_from_the_distribution_origin() {
        let template = synthesize_stack(&sample_params());
        let cors = &template.resources["HttpApi"].properties["CorsConfiguration"];

        assert_eq!(cors["AllowMethods"], json!(["GET"]));
        assert_eq!(
            cors["AllowOrigins"],
            json!([{ "Fn::Sub": "https://${SiteDistribution.DomainName}" }])
        );
    }

    #[test]
    fn function_receives_table_name_and_region() {
        let template = synthesize_stack(&sample_params());
        let function = &template.resources["HitCounterFunction"];

        assert_eq!(
            function.properties["Environment"]["Variables"],
            json!({
                "HITS_TABLE_NAME": { "Ref": "HitsTable" },
                "REGION": { "Ref": "AWS::Region" }
            })
        );
        assert_eq!(function.properties["Architectures"], json!(["arm64"]));
        assert_eq!(
            function.properties["Code"],
            json!({ "S3Bucket": "artifact-bucket", "S3Key": "dist/hit_counter_lambda.zip" })
        );
    }

    #[test]
    fn role_grants_read_write_on_the_table_arn() {
        let template = synthesize_stack(&sample_params());
        let statement = &template.resources["HitCounterRole"].properties["Policies"][0]
            ["PolicyDocument"]["Statement"][0];

        assert_eq!(statement["Effect"], json!("Allow"));
        assert_eq!(statement["Action"], json!(TABLE_READ_WRITE_ACTIONS));
        assert_eq!(
            statement["Resource"],
            json!({ "Fn::GetAtt": ["HitsTable", "Arn"] })
        );
    }

    #[test]
    fn default_route_targets_the_lambda_integration() {
        let template = synthesize_stack(&sample_params());
        let route = &template.resources["HttpApiDefaultRoute"];

        assert_eq!(route.properties["RouteKey"], json!("$default"));
        assert_eq!(
            route.properties["Target"],
            json!({ "Fn::Sub": "integrations/${HttpApiIntegration}" })
        );

        let integration = &template.resources["HttpApiIntegration"];
        assert_eq!(integration.properties["IntegrationType"], json!("AWS_PROXY"));
        assert_eq!(
            integration.properties["PayloadFormatVersion"],
            json!("2.0")
        );
    }

    #[test]
    fn bucket_policy_is_conditioned_on_the_distribution_arn() {
        let template = synthesize_stack(&sample_params());
        let statement = &template.resources["SiteBucketPolicy"].properties["PolicyDocument"]
            ["Statement"][0];

        assert_eq!(
            statement["Principal"],
            json!({ "Service": "cloudfront.amazonaws.com" })
        );
        assert_eq!(
            statement["Condition"]["StringEquals"]["AWS:SourceArn"],
            json!({
                "Fn::Sub":
                    "arn:${AWS::Partition}:cloudfront::${AWS::AccountId}:distribution/${SiteDistribution}"
            })
        );
    }

    #[test]
    fn without_custom_domain_no_dns_or_certificate_is_declared() {
        let template = synthesize_stack(&sample_params());

        assert!(!template.resources.contains_key("SiteAliasRecord"));
        assert!(!template.resources.contains_key("SiteAliasRecordIpv6"));

        let distribution_config =
            &template.resources["SiteDistribution"].properties["DistributionConfig"];
        assert!(distribution_config.get("Aliases").is_none());
        assert!(distribution_config.get("ViewerCertificate").is_none());
    }

    #[test]
    fn custom_domain_adds_aliases_certificate_and_both_record_types() {
        let template = synthesize_stack(&sample_params_with_domain());

        let distribution_config =
            &template.resources["SiteDistribution"].properties["DistributionConfig"];
        assert_eq!(
            distribution_config["Aliases"],
            json!(["hits.example.com"])
        );
        assert_eq!(
            distribution_config["ViewerCertificate"]["AcmCertificateArn"],
            json!("arn:aws:acm:us-east-1:123456789012:certificate/abc")
        );

        for (logical_id, record_type) in
            [("SiteAliasRecord", "A"), ("SiteAliasRecordIpv6", "AAAA")]
        {
            let record = &template.resources[logical_id];
            assert_eq!(record.properties["Type"], json!(record_type));
            assert_eq!(record.properties["Name"], json!("hits.example.com"));
            assert_eq!(
                record.properties["HostedZoneName"],
                json!("hits.example.com.")
            );
            assert_eq!(
                record.properties["AliasTarget"]["HostedZoneId"],
                json!(CLOUDFRONT_HOSTED_ZONE_ID)
            );
        }
    }

    #[test]
    fn declares_api_and_distribution_outputs() {
        let template = synthesize_stack(&sample_params());

        assert_eq!(
            template.outputs["ApiUrl"].value,
            json!({ "Fn::GetAtt": ["HttpApi", "ApiEndpoint"] })
        );
        assert_eq!(
            template.outputs["CloudFrontDomain"].value,
            json!({ "Fn::GetAtt": ["SiteDistribution", "DomainName"] })
        );
        assert_eq!(
            template.outputs["SiteBucketName"].value,
            json!({ "Ref": "SiteBucket" })
        );
    }
}
