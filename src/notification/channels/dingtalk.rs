//! 钉钉机器人渠道 - 通过自定义机器人 webhook 发送 actionCard 消息
//!
//! 配置了加签密钥的机器人会在 URL 上附加 `timestamp` 和 `sign`：
//! `sign = urlencode(base64(hmac_sha256(secret, "{timestamp}\n{secret}")))`

use anyhow::Result;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::{RegistryReader, RobotConfig};
use crate::notification::message::MessagePayload;
use crate::notification::transport::{RobotTransport, SendResult};

type HmacSha256 = Hmac<Sha256>;

/// 钉钉发送错误
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("robot `{0}` is not registered")]
    UnknownRobot(String),

    #[error("failed to sign webhook url: {0}")]
    Signing(String),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("robot rejected message (errcode {code}): {message}")]
    Rejected { code: i64, message: String },
}

/// 钉钉接口响应
#[derive(Debug, Deserialize)]
struct RobotResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// 钉钉机器人渠道
pub struct DingTalkTransport {
    registry: Arc<dyn RegistryReader>,
    client: reqwest::blocking::Client,
}

impl DingTalkTransport {
    /// 创建渠道，`timeout` 是单次 webhook 调用的上限
    pub fn new(registry: Arc<dyn RegistryReader>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { registry, client })
    }

    fn post(&self, robot_id: &str, payload: &MessagePayload) -> Result<(), TransportError> {
        let robot = self
            .registry
            .find_robot(robot_id)
            .ok_or_else(|| TransportError::UnknownRobot(robot_id.to_string()))?;

        let url = webhook_url(&robot, chrono::Utc::now().timestamp_millis())?;
        debug!(robot = %robot.name, title = %payload.title, "Posting to DingTalk webhook");

        let response: RobotResponse = self
            .client
            .post(url)
            .json(&wire_body(payload))
            .send()?
            .error_for_status()?
            .json()?;

        if response.errcode != 0 {
            return Err(TransportError::Rejected {
                code: response.errcode,
                message: response.errmsg,
            });
        }
        Ok(())
    }
}

impl RobotTransport for DingTalkTransport {
    fn name(&self) -> &str {
        "dingtalk"
    }

    fn send(&self, robot_id: &str, payload: &MessagePayload) -> Result<SendResult> {
        match self.post(robot_id, payload) {
            Ok(()) => Ok(SendResult::Sent),
            Err(TransportError::Rejected { message, .. }) => Ok(SendResult::Failed(message)),
            Err(e) => Err(e.into()),
        }
    }
}

/// 机器人的实际请求地址（有密钥时加签）
pub fn webhook_url(robot: &RobotConfig, timestamp_ms: i64) -> Result<String, TransportError> {
    let secret = match robot.secret.as_deref().map(str::trim) {
        Some(secret) if !secret.is_empty() => secret,
        _ => return Ok(robot.webhook.clone()),
    };
    let sign = sign(secret, timestamp_ms)?;
    let separator = if robot.webhook.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}timestamp={}&sign={}",
        robot.webhook, separator, timestamp_ms, sign
    ))
}

/// 计算签名（已 URL 编码）
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String, TransportError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| TransportError::Signing(e.to_string()))?;
    mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
    let digest = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    Ok(urlencoding::encode(&digest).into_owned())
}

/// 组装钉钉 actionCard 请求体
pub fn wire_body(payload: &MessagePayload) -> Value {
    let mut text = payload.body_markdown.clone();
    if !payload.at_mobiles.is_empty() {
        let mentions: Vec<String> = payload.at_mobiles.iter().map(|m| format!("@{}", m)).collect();
        text.push_str("\n\n");
        text.push_str(&mentions.join(" "));
    }

    let buttons: Vec<Value> = payload
        .buttons
        .iter()
        .map(|b| json!({ "title": b.title, "actionURL": b.action_url }))
        .collect();

    json!({
        "msgtype": "actionCard",
        "actionCard": {
            "title": payload.title,
            "text": text,
            "btns": buttons,
            "btnOrientation": "1",
        },
        "at": {
            "atMobiles": payload.at_mobiles,
            "isAtAll": payload.at_all,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::message::ActionButton;
    use std::collections::BTreeSet;

    fn payload(mobiles: &[&str]) -> MessagePayload {
        MessagePayload {
            title: "demo 成功".to_string(),
            body_markdown: "# demo".to_string(),
            at_all: false,
            at_mobiles: mobiles.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
            buttons: vec![ActionButton::new("控制台", "http://ci/job/demo/42/console")],
        }
    }

    #[test]
    fn test_url_without_secret_is_unchanged() {
        let robot = RobotConfig::new("r1", "ops", "https://oapi.dingtalk.com/robot/send?access_token=t");
        assert_eq!(webhook_url(&robot, 1).unwrap(), robot.webhook);

        let blank = robot.clone().with_secret("  ");
        assert_eq!(webhook_url(&blank, 1).unwrap(), robot.webhook);
    }

    #[test]
    fn test_signed_url_is_deterministic() {
        let robot = RobotConfig::new("r1", "ops", "https://oapi.dingtalk.com/robot/send?access_token=t")
            .with_secret("SEC000");

        let first = webhook_url(&robot, 1_700_000_000_000).unwrap();
        let second = webhook_url(&robot, 1_700_000_000_000).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("https://oapi.dingtalk.com/robot/send?access_token=t&timestamp=1700000000000&sign="));

        let sign = first.rsplit("sign=").next().unwrap();
        assert!(!sign.contains('+') && !sign.contains('/') && !sign.contains('='));
        assert_ne!(webhook_url(&robot, 1_700_000_000_001).unwrap(), first);
    }

    #[test]
    fn test_sign_decodes_to_sha256_digest() {
        let encoded = sign("SEC000", 42).unwrap();
        let decoded = urlencoding::decode(&encoded).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(decoded.as_bytes()).unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn test_wire_body_shape() {
        let body = wire_body(&payload(&["13800000000"]));
        assert_eq!(body["msgtype"], "actionCard");
        assert_eq!(body["actionCard"]["title"], "demo 成功");
        assert_eq!(body["actionCard"]["text"], "# demo\n\n@13800000000");
        assert_eq!(body["actionCard"]["btns"][0]["actionURL"], "http://ci/job/demo/42/console");
        assert_eq!(body["at"]["atMobiles"][0], "13800000000");
        assert_eq!(body["at"]["isAtAll"], false);
    }

    #[test]
    fn test_wire_body_without_mentions() {
        let body = wire_body(&payload(&[]));
        assert_eq!(body["actionCard"]["text"], "# demo");
        assert!(body["at"]["atMobiles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_robot_is_an_error() {
        let transport = DingTalkTransport::new(Arc::new(Vec::<RobotConfig>::new()), Duration::from_secs(1)).unwrap();
        let err = transport.send("missing", &payload(&[])).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
