/// 统一日志模块
/// 控制台与文件双路输出，按大小轮转，供整个监听进程使用
use chrono::Local;
use log::{LevelFilter, Metadata, Record};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub root_dir: String,
    pub default_level: String,
    pub max_file_size_mb: u64,
    pub console_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            root_dir: "logs".to_string(),
            default_level: "INFO".to_string(),
            max_file_size_mb: 10,
            console_output: true,
        }
    }
}

impl LogConfig {
    /// 解析配置中的日志级别
    pub fn level_filter(&self) -> LevelFilter {
        match self.default_level.to_uppercase().as_str() {
            "TRACE" => LevelFilter::Trace,
            "DEBUG" => LevelFilter::Debug,
            "INFO" => LevelFilter::Info,
            "WARN" => LevelFilter::Warn,
            "ERROR" => LevelFilter::Error,
            _ => LevelFilter::Info,
        }
    }
}

/// 统一日志器
pub struct UnifiedLogger {
    config: LogConfig,
    level: LevelFilter,
    file: Mutex<Option<fs::File>>,
    current_size: Mutex<u64>,
}

impl UnifiedLogger {
    pub fn new(config: LogConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if !Path::new(&config.root_dir).exists() {
            fs::create_dir_all(&config.root_dir)?;
        }

        let path = Self::log_path(&config);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            level: config.level_filter(),
            config,
            file: Mutex::new(Some(file)),
            current_size: Mutex::new(current_size),
        })
    }

    /// 当前日志文件路径: {root}/listener_{YYYYMMDD}.log
    fn log_path(config: &LogConfig) -> PathBuf {
        let date = Local::now().format("%Y%m%d");
        PathBuf::from(format!("{}/listener_{}.log", config.root_dir, date))
    }

    /// 写入文件（带自动轮转）
    fn write_to_file(&self, line: &str) {
        let mut file_guard = match self.file.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let mut size_guard = match self.current_size.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        let max_size = self.config.max_file_size_mb * 1024 * 1024;
        if *size_guard + line.len() as u64 > max_size {
            *file_guard = None;

            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let rotated = format!("{}/listener_{}_rotated.log", self.config.root_dir, timestamp);
            if let Ok(new_file) = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&rotated)
            {
                *file_guard = Some(new_file);
                *size_guard = 0;
            }
        }

        if let Some(ref mut file) = *file_guard {
            if file.write_all(line.as_bytes()).is_ok() {
                *size_guard += line.len() as u64;
                let _ = file.flush();
            }
        }
    }
}

impl log::Log for UnifiedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!(
            "[{}] [{}] [{}] {}\n",
            timestamp,
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        );

        self.write_to_file(&line);

        if self.config.console_output {
            print!("{}", line);
        }
    }

    fn flush(&self) {}
}

/// 初始化全局日志器
pub fn init_global_logger(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let level = config.level_filter();
    let logger = UnifiedLogger::new(config)?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}
