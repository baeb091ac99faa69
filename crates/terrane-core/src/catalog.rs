//! The static resource classification table.
//!
//! The catalog tells the grouping engine which resource types are "main"
//! diagram blocks, which types are absorbed into a main block as secondary
//! members, and which data sources belong to it, along with display metadata
//! (category, service name, icon path).
//!
//! The table is loaded once from text and consulted read-only afterwards. A
//! resource type without a row is simply never grouped; missing entries are
//! not errors.

use indexmap::IndexMap;
use log::{debug, warn};

/// One row of the classification table, keyed by resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    /// The resource type this row describes.
    pub resource_type: String,
    /// Types registered as main diagram blocks for this row.
    pub main_blocks: Vec<String>,
    /// Types absorbed into this row's main block as secondary members.
    pub secondary_blocks: Vec<String>,
    /// Data source types absorbed into this row's main block.
    pub data_sources: Vec<String>,
    /// Display category (compute, network, storage, …).
    pub category: String,
    /// Human-readable service name.
    pub service_name: String,
    /// Path of the icon used when rendering the block.
    pub icon_path: String,
}

/// Lookup table from resource type to its classification row.
///
/// # Table format
///
/// One row per line, seven `;`-separated fields, membership lists joined
/// with commas, `#` starts a comment:
///
/// ```text
/// aws_instance; aws_instance; aws_security_group,aws_eip; aws_ami; compute; EC2; icons/ec2.svg
/// ```
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    rows: IndexMap<String, CatalogRow>,
}

impl ResourceCatalog {
    /// Parses a catalog from table text.
    ///
    /// Malformed lines are skipped with a warning; a duplicate resource type
    /// keeps the first row seen.
    pub fn load(text: &str) -> Self {
        let mut rows = IndexMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(';').map(str::trim).collect();
            if fields.len() != 7 {
                warn!(line; "skipping malformed catalog row");
                continue;
            }
            let row = CatalogRow {
                resource_type: fields[0].to_string(),
                main_blocks: split_list(fields[1]),
                secondary_blocks: split_list(fields[2]),
                data_sources: split_list(fields[3]),
                category: fields[4].to_string(),
                service_name: fields[5].to_string(),
                icon_path: fields[6].to_string(),
            };
            if rows.contains_key(&row.resource_type) {
                warn!(resource_type = row.resource_type.as_str(); "duplicate catalog row, keeping first");
                continue;
            }
            rows.insert(row.resource_type.clone(), row);
        }

        debug!(rows = rows.len(); "resource catalog loaded");
        Self { rows }
    }

    /// Returns the row for the given resource type, if registered.
    pub fn row(&self, resource_type: &str) -> Option<&CatalogRow> {
        self.rows.get(resource_type)
    }

    /// Whether the type is registered as a main diagram block.
    pub fn is_main(&self, resource_type: &str) -> bool {
        self.rows
            .get(resource_type)
            .is_some_and(|row| row.main_blocks.iter().any(|t| t == resource_type))
    }

    /// Whether `candidate` is a secondary block of `main_type`.
    pub fn is_secondary_of(&self, main_type: &str, candidate: &str) -> bool {
        self.rows
            .get(main_type)
            .is_some_and(|row| row.secondary_blocks.iter().any(|t| t == candidate))
    }

    /// Whether `candidate` is a data source of `main_type`.
    pub fn is_data_source_of(&self, main_type: &str, candidate: &str) -> bool {
        self.rows
            .get(main_type)
            .is_some_and(|row| row.data_sources.iter().any(|t| t == candidate))
    }

    /// Returns the number of registered rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for ResourceCatalog {
    /// Loads the built-in table covering common AWS service types.
    fn default() -> Self {
        Self::load(BUILTIN_TABLE)
    }
}

fn split_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Built-in classification rows for common AWS service types.
const BUILTIN_TABLE: &str = "\
# resource_type; main_blocks; secondary_blocks; data_sources; category; service_name; icon_path
aws_instance; aws_instance; aws_security_group,aws_eip,aws_ebs_volume,aws_volume_attachment,aws_key_pair; aws_ami; compute; EC2; icons/aws/ec2.svg
aws_lambda_function; aws_lambda_function; aws_iam_role,aws_iam_role_policy_attachment,aws_cloudwatch_log_group,aws_lambda_permission; aws_iam_policy_document; compute; Lambda; icons/aws/lambda.svg
aws_ecs_service; aws_ecs_service; aws_ecs_task_definition,aws_ecs_cluster,aws_security_group; ; compute; ECS; icons/aws/ecs.svg
aws_autoscaling_group; aws_autoscaling_group; aws_launch_template,aws_launch_configuration; aws_ami; compute; Auto Scaling; icons/aws/asg.svg
aws_db_instance; aws_db_instance; aws_db_subnet_group,aws_db_parameter_group,aws_security_group; ; database; RDS; icons/aws/rds.svg
aws_dynamodb_table; aws_dynamodb_table; ; ; database; DynamoDB; icons/aws/dynamodb.svg
aws_elasticache_cluster; aws_elasticache_cluster; aws_elasticache_subnet_group; ; database; ElastiCache; icons/aws/elasticache.svg
aws_s3_bucket; aws_s3_bucket; aws_s3_bucket_policy,aws_s3_bucket_versioning,aws_s3_bucket_public_access_block,aws_s3_bucket_acl; ; storage; S3; icons/aws/s3.svg
aws_vpc; aws_vpc; aws_internet_gateway,aws_route_table,aws_route,aws_route_table_association,aws_nat_gateway,aws_vpn_gateway; ; network; VPC; icons/aws/vpc.svg
aws_subnet; aws_subnet; aws_route_table_association,aws_network_acl; aws_availability_zones; network; Subnet; icons/aws/subnet.svg
aws_lb; aws_lb; aws_lb_listener,aws_lb_target_group,aws_lb_target_group_attachment,aws_security_group; ; network; ELB; icons/aws/elb.svg
aws_cloudfront_distribution; aws_cloudfront_distribution; aws_cloudfront_origin_access_identity; ; network; CloudFront; icons/aws/cloudfront.svg
aws_route53_record; aws_route53_record; aws_route53_zone; ; network; Route 53; icons/aws/route53.svg
aws_sqs_queue; aws_sqs_queue; aws_sqs_queue_policy; ; integration; SQS; icons/aws/sqs.svg
aws_sns_topic; aws_sns_topic; aws_sns_topic_subscription,aws_sns_topic_policy; ; integration; SNS; icons/aws/sns.svg
aws_api_gateway_rest_api; aws_api_gateway_rest_api; aws_api_gateway_resource,aws_api_gateway_method,aws_api_gateway_deployment,aws_api_gateway_stage; ; integration; API Gateway; icons/aws/apigw.svg
aws_iam_user; aws_iam_user; aws_iam_user_policy,aws_iam_access_key; aws_iam_policy_document; security; IAM; icons/aws/iam.svg
aws_kms_key; aws_kms_key; aws_kms_alias; ; security; KMS; icons/aws/kms.svg
aws_eks_cluster; aws_eks_cluster; aws_eks_node_group,aws_iam_role,aws_security_group; ; compute; EKS; icons/aws/eks.svg
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let catalog = ResourceCatalog::default();
        assert!(!catalog.is_empty());
        assert!(catalog.is_main("aws_instance"));
        assert!(catalog.is_main("aws_s3_bucket"));
        assert!(!catalog.is_main("aws_security_group"));
    }

    #[test]
    fn test_secondary_and_data_source_membership() {
        let catalog = ResourceCatalog::default();
        assert!(catalog.is_secondary_of("aws_instance", "aws_security_group"));
        assert!(!catalog.is_secondary_of("aws_instance", "aws_db_subnet_group"));
        assert!(catalog.is_data_source_of("aws_instance", "aws_ami"));
        assert!(!catalog.is_data_source_of("aws_s3_bucket", "aws_ami"));
    }

    #[test]
    fn test_missing_entry_is_absent() {
        let catalog = ResourceCatalog::default();
        assert!(catalog.row("aws_made_up_type").is_none());
        assert!(!catalog.is_main("aws_made_up_type"));
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let catalog = ResourceCatalog::load(
            "aws_instance; aws_instance; ; ; compute; EC2; icons/ec2.svg\n\
             not a valid row\n\
             # a comment\n",
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_duplicate_type_keeps_first_row() {
        let catalog = ResourceCatalog::load(
            "aws_instance; aws_instance; ; ; compute; EC2; first.svg\n\
             aws_instance; aws_instance; ; ; compute; EC2; second.svg\n",
        );
        assert_eq!(catalog.row("aws_instance").unwrap().icon_path, "first.svg");
    }

    #[test]
    fn test_row_metadata() {
        let catalog = ResourceCatalog::default();
        let row = catalog.row("aws_db_instance").unwrap();
        assert_eq!(row.category, "database");
        assert_eq!(row.service_name, "RDS");
    }
}
