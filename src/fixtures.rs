//! Shared test model

use crate::schema::ApiModel;

const BOT_API: &str = include_str!("../models/bot_api.yaml");

pub fn model() -> ApiModel {
    serde_yaml::from_str(BOT_API).unwrap()
}
