//! Container image lookup by region.

use crate::error::{ChurnError, Result};

/// Default training/serving image repository and tag.
pub const XGBOOST_REPOSITORY: &str = "sagemaker-xgboost";
pub const XGBOOST_VERSION: &str = "1.7-1";

/// Image repository for compiled models.
pub const NEO_REPOSITORY: &str = "xgboost-neo";

const XGBOOST_ACCOUNTS: &[(&str, &str)] = &[
    ("us-east-1", "683313688378"),
    ("us-east-2", "257758044811"),
    ("us-west-1", "746614075791"),
    ("us-west-2", "246618743249"),
    ("eu-west-1", "141502667606"),
    ("eu-west-2", "764974769150"),
    ("eu-west-3", "659782779980"),
    ("eu-central-1", "492215442770"),
    ("eu-north-1", "662702820516"),
    ("ap-northeast-1", "354813040037"),
    ("ap-northeast-2", "366743142698"),
    ("ap-southeast-1", "121021644041"),
    ("ap-southeast-2", "783357654285"),
    ("ap-south-1", "720646828776"),
    ("ca-central-1", "341280168497"),
    ("sa-east-1", "737474898029"),
];

const NEO_ACCOUNTS: &[(&str, &str)] = &[
    ("us-west-1", "710691900526"),
    ("us-west-2", "301217895009"),
    ("us-east-1", "785573368785"),
    ("us-east-2", "007439368137"),
    ("eu-west-1", "802834080501"),
    ("eu-west-2", "205493899709"),
    ("eu-west-3", "254080097072"),
    ("eu-north-1", "601324751636"),
    ("eu-central-1", "746233611703"),
    ("ap-northeast-1", "941853720454"),
    ("ap-northeast-2", "151534178276"),
    ("ap-east-1", "110948597952"),
    ("ap-southeast-1", "324986816169"),
    ("ap-southeast-2", "355873309152"),
    ("ap-south-1", "763008648453"),
    ("sa-east-1", "756306329178"),
    ("ca-central-1", "464438896020"),
    ("me-south-1", "836785723513"),
];

fn registry(region: &str, repository: &str) -> Result<String> {
    let table = if repository == NEO_REPOSITORY {
        NEO_ACCOUNTS
    } else {
        XGBOOST_ACCOUNTS
    };
    table
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, account)| format!("{}.dkr.ecr.{}.amazonaws.com", account, region))
        .ok_or_else(|| ChurnError::UnsupportedRegion {
            region: region.to_string(),
            repository: repository.to_string(),
        })
}

/// `{account}.dkr.ecr.{region}.amazonaws.com/{repository}:{version}`
pub fn image_uri(region: &str, repository: &str, version: &str) -> Result<String> {
    Ok(format!("{}/{}:{}", registry(region, repository)?, repository, version))
}

/// Serving image for compiled models; errors where compilation is unavailable.
pub fn neo_image_uri(region: &str) -> Result<String> {
    image_uri(region, NEO_REPOSITORY, "latest")
}
