//! 檔案日誌
//!
//! 每個 `Logger` 擁有一條 channel 與一條寫入執行緒，呼叫端只負責送出訊息，
//! 實際寫檔、批次 flush 與輪轉交給 [`rotate::Rotate`]。

use std::thread;

use chrono::{format::DelayedFormat, DateTime, Local};
use concat_string::concat_string;
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

pub mod rotate;

use rotate::Rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 單次寫入的批次大小上限
const BATCH_SIZE: usize = 4096;

pub struct Logger {
    writer: Sender<LogMessage>,
}

impl Logger {
    /// 建立名為 `log_name` 的日誌，檔名為 `log/%Y-%m-%d-{log_name}.log`
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();
        let pattern = format!("log/%Y-%m-%d-{}.log", log_name);

        //寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(pattern);
            let mut together = String::with_capacity(BATCH_SIZE);

            while let Ok(received) = rx.recv() {
                together.push_str(&concat_string!(
                    received.created_at.format("%F %X%.6f").to_string(),
                    " ",
                    received.level.to_string(),
                    " ",
                    received.msg,
                    "\r\n"
                ));

                if rx.is_empty() || together.len() >= BATCH_SIZE {
                    if let Err(why) = rotate.write_msg(Local::now(), together.as_bytes()) {
                        error_console(format!("Failed to write log because {:?}", why));
                        info_console(together.clone());
                    }
                    together.clear();
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn info(&self, log: String) {
        self.send(log::Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(log::Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(log::Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(log::Level::Debug, log);
    }

    fn send(&self, level: log::Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
