//! Логирование сканера: env_logger, уровень из RUST_LOG

use std::env;

/// Инициализация системы логирования
///
/// Уровни логирования настраиваются через переменную окружения RUST_LOG:
/// - RUST_LOG=warn - только сбои загрузки и доставки
/// - RUST_LOG=info - алерты и сводка по циклу (по умолчанию)
/// - RUST_LOG=debug - причина пропуска каждого символа
///
/// Можно указать для конкретного модуля:
/// - RUST_LOG=marubozu_scanner::screener=debug
pub fn init_logging() {
    let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    // Уровень по умолчанию info, RUST_LOG перекрывает его
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_filters(&level)
        .format_timestamp_secs()
        .format_module_path(true)
        .format_target(false)
        .init();

    log::info!("✅ Система логирования инициализирована");
    log::info!("📝 Уровень логирования: {}", level);
}
