use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub distributor: DistributorConfig,
    pub call_policy: CallPolicyConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributorConfig {
    pub enabled: bool,
    /// 批量分配的轮询间隔（秒）
    pub distribute_interval_seconds: u64,
}

/// 通话结果重排策略参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallPolicyConfig {
    /// 未接重试上限，到达后线索终止为NotInterested
    pub max_retries: i32,
    /// 未接后的冷却时长（分钟），期间线索不参与分配
    pub no_answer_cooldown_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub cors_enabled: bool,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://dialer.db".to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout_seconds: 30,
                idle_timeout_seconds: 600,
            },
            distributor: DistributorConfig {
                enabled: true,
                distribute_interval_seconds: 10,
            },
            call_policy: CallPolicyConfig {
                max_retries: 3,
                no_answer_cooldown_minutes: 240, // 4小时
            },
            api: ApiConfig {
                enabled: true,
                bind_address: "0.0.0.0:8080".to_string(),
                cors_enabled: true,
                request_timeout_seconds: 30,
            },
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/dialer.toml",
                "dialer.toml",
                "/etc/dialer/config.toml",
            ];

            let mut config_file_found = false;
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    config_file_found = true;
                    break;
                }
            }

            if !config_file_found {
                builder = builder
                    .set_default("database.url", "sqlite://dialer.db")?
                    .set_default("database.max_connections", 10)?
                    .set_default("database.min_connections", 1)?
                    .set_default("database.connection_timeout_seconds", 30)?
                    .set_default("database.idle_timeout_seconds", 600)?
                    .set_default("distributor.enabled", true)?
                    .set_default("distributor.distribute_interval_seconds", 10)?
                    .set_default("call_policy.max_retries", 3)?
                    .set_default("call_policy.no_answer_cooldown_minutes", 240)?
                    .set_default("api.enabled", true)?
                    .set_default("api.bind_address", "0.0.0.0:8080")?
                    .set_default("api.cors_enabled", true)?
                    .set_default("api.request_timeout_seconds", 30)?;
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("DIALER")
                .separator("_")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!("数据库URL不能为空"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("数据库最大连接数必须大于0"));
        }
        if self.database.max_connections < self.database.min_connections {
            return Err(anyhow::anyhow!("数据库最大连接数不能小于最小连接数"));
        }
        if self.distributor.distribute_interval_seconds == 0 {
            return Err(anyhow::anyhow!("分配轮询间隔必须大于0"));
        }
        if self.call_policy.max_retries < 1 {
            return Err(anyhow::anyhow!("重试上限必须至少为1"));
        }
        if self.call_policy.no_answer_cooldown_minutes < 0 {
            return Err(anyhow::anyhow!("冷却时长不能为负"));
        }
        if self.api.enabled && self.api.bind_address.is_empty() {
            return Err(anyhow::anyhow!("API监听地址不能为空"));
        }
        Ok(())
    }
}
