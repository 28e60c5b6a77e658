use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{Config, EnvPresence};
use crate::error::{BotError, RateError};
use crate::rates::{Currency, Rate, RateQuery, RateSource};

pub const WELCOME_TEXT: &str = "欢迎！发送 /rate 或 /汇率 获取人民币对美元现汇卖出价。\n调试：/debug_env";
pub const RATE_UNAVAILABLE_TEXT: &str = "汇率查询失败，请稍后再试。";
pub const RATE_MISSING_TEXT: &str = "未获取到汇率数据。";

/// Commands the bot answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    /// Optional ISO code argument, e.g. `/rate EUR`
    Rate(Option<String>),
    DebugEnv,
}

impl Command {
    /// `Ok(None)` for text that is not a command at all, or a command
    /// addressed to another bot (`/start@OtherBot`). Without a known
    /// `bot_username` every suffix is accepted.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Result<Option<Self>, BotError> {
        let mut parts = text.split_whitespace();
        let Some(head) = parts.next().and_then(|h| h.strip_prefix('/')) else {
            return Ok(None);
        };

        let (name, addressee) = match head.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (head, None),
        };
        if let (Some(addressee), Some(own)) = (addressee, bot_username) {
            if !addressee.eq_ignore_ascii_case(own.trim_start_matches('@')) {
                return Ok(None);
            }
        }

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "rate" | "汇率" => Command::Rate(parts.next().map(str::to_string)),
            "debug_env" => Command::DebugEnv,
            _ => return Err(BotError::UnknownCommand(name.to_string())),
        };
        Ok(Some(command))
    }
}

/// Answers commands; holds everything injected at startup.
pub struct CommandHandlers {
    rates: Arc<dyn RateSource>,
    timeout: Duration,
    decimals: usize,
    env: EnvPresence,
    masked_token: String,
    base_url: Option<String>,
    bot_username: Option<String>,
}

impl CommandHandlers {
    pub fn new(config: &Config, rates: Arc<dyn RateSource>) -> Self {
        Self {
            rates,
            timeout: config.rate.timeout(),
            decimals: config.rate.decimals,
            env: config.env,
            masked_token: config.masked_token(),
            base_url: config.base_url().map(str::to_string),
            bot_username: config.telegram.bot_username.clone(),
        }
    }

    /// Username used to tell our commands from other bots' in group chats.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Produce the reply for a message, or `None` when it needs no answer.
    pub async fn respond(&self, text: &str) -> Option<String> {
        match Command::parse(text, self.bot_username.as_deref()) {
            Ok(Some(Command::Start)) => Some(self.start()),
            Ok(Some(Command::Rate(arg))) => Some(self.rate(arg.as_deref()).await),
            Ok(Some(Command::DebugEnv)) => Some(self.debug_env()),
            Ok(None) => None,
            Err(e) => {
                debug!("Ignoring message: {}", e);
                None
            }
        }
    }

    pub fn start(&self) -> String {
        WELCOME_TEXT.to_string()
    }

    /// Spot sell rate reply; never fails, errors become an apology.
    pub async fn rate(&self, code: Option<&str>) -> String {
        let currency = match code {
            None => Currency::Usd,
            Some(code) => match Currency::from_code(code) {
                Some(c) => c,
                None => return unsupported_currency(code),
            },
        };

        match self.lookup(currency).await {
            Ok(rate) => self.format_rate(currency, &rate),
            Err(e) => {
                warn!("Rate lookup for {} failed: {}", currency, e);
                match e {
                    BotError::UpstreamUnavailable(RateError::NotQuoted(_)) => {
                        RATE_MISSING_TEXT.to_string()
                    }
                    _ => RATE_UNAVAILABLE_TEXT.to_string(),
                }
            }
        }
    }

    async fn lookup(&self, currency: Currency) -> Result<Rate, BotError> {
        let query = RateQuery::spot_sell(currency);
        let rate = tokio::time::timeout(self.timeout, self.rates.lookup_rate(&query))
            .await
            .map_err(|_| RateError::Timeout(self.timeout))??;

        if !rate.value.is_finite() || rate.value <= 0.0 {
            return Err(RateError::Malformed(format!("{} rate {}", currency, rate.value)).into());
        }
        Ok(rate)
    }

    fn format_rate(&self, currency: Currency, rate: &Rate) -> String {
        let source = match rate.published_at {
            Some(at) => format!("中国银行，发布时间 {}", at.format("%Y-%m-%d %H:%M:%S")),
            None => "中国银行".to_string(),
        };
        format!(
            "人民币对{}现汇卖出价：{:.prec$} CNY per {}（{}）",
            currency.chinese_name(),
            rate.value,
            currency.code(),
            source,
            prec = self.decimals,
        )
    }

    pub fn debug_env(&self) -> String {
        let yes_no = |present: bool| if present { "是" } else { "否" };
        format!(
            "服务端读取到的环境变量：\n\
             - TELEGRAM_TOKEN 存在？ {}\n\
             - TOKEN 存在？ {}\n\
             - BASE_URL 存在？ {}\n\
             - TOKEN(脱敏)：{}\n\
             - BASE_URL：{}\n",
            yes_no(self.env.telegram_token),
            yes_no(self.env.token),
            yes_no(self.env.base_url),
            self.masked_token,
            self.base_url.as_deref().unwrap_or("None"),
        )
    }
}

fn unsupported_currency(code: &str) -> String {
    let supported: Vec<&str> = Currency::ALL.iter().map(|c| c.code()).collect();
    format!("不支持的币种：{}（支持：{}）", code, supported.join(", "))
}
