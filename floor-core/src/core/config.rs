use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 核心配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录（数据库、日志） |
/// | DB_FILE | floor.redb | 数据库文件名 |
/// | STORE_TIMEOUT_MS | 5000 | 每次存储调用的超时(毫秒) |
/// | AUDIT_BUFFER_SIZE | 1024 | 审计队列容量 |
/// | EVENT_CHANNEL_CAPACITY | 1024 | 事件广播容量 |
/// | AUDIT_QUERY_CAP | 500 | 审计查询默认 / 最大条数 |
/// | MOVEMENT_HISTORY_LIMIT | 50 | 库存流水默认条数 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/floor STORE_TIMEOUT_MS=2000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    pub db_file: String,
    /// 存储调用超时 (毫秒)
    pub store_timeout_ms: u64,
    pub audit_buffer_size: usize,
    pub event_channel_capacity: usize,
    pub audit_query_cap: usize,
    pub movement_history_limit: usize,
    pub log_level: String,
    pub log_json: bool,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置，未设置或无法解析时使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::with_work_dir("./data");
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or(defaults.work_dir),
            db_file: std::env::var("DB_FILE").unwrap_or(defaults.db_file),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            audit_buffer_size: env_or("AUDIT_BUFFER_SIZE", defaults.audit_buffer_size),
            event_channel_capacity: env_or("EVENT_CHANNEL_CAPACITY", defaults.event_channel_capacity),
            audit_query_cap: env_or("AUDIT_QUERY_CAP", defaults.audit_query_cap),
            movement_history_limit: env_or("MOVEMENT_HISTORY_LIMIT", defaults.movement_history_limit),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: env_or("LOG_JSON", defaults.log_json),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// 默认配置，仅指定工作目录（不读环境变量）
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            db_file: "floor.redb".into(),
            store_timeout_ms: 5000,
            audit_buffer_size: 1024,
            event_channel_capacity: 1024,
            audit_query_cap: 500,
            movement_history_limit: 50,
            log_level: "info".into(),
            log_json: false,
            environment: "development".into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
