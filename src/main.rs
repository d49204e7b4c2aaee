// ==========================================
// 帆船赛计分引擎 - 命令行入口
// ==========================================
// 用法:
//   regatta-scoring [--db PATH] [--json-log] rescore <regatta_id>
//   regatta-scoring [--db PATH] check-finalize <regatta_id>
//   regatta-scoring [--db PATH] finalize <regatta_id>
//   regatta-scoring [--db PATH] rotate <regatta_id> <request.json> [--races 1-4,6]
//
// 结果以 JSON 输出到 stdout, 日志写 stderr
// ==========================================

use anyhow::{bail, Context};
use regatta_scoring::config::ConfigManager;
use regatta_scoring::db::{init_schema, open_sqlite_connection};
use regatta_scoring::domain::RotationRequest;
use regatta_scoring::engine::parse_range;
use regatta_scoring::repository::SqliteRegattaRepository;
use regatta_scoring::{logging, ScoringApi, APP_NAME, VERSION};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const DB_PATH_ENV: &str = "REGATTA_SCORING_DB_PATH";

const USAGE: &str = "用法: regatta-scoring [--db PATH] [--json-log] \
<rescore|check-finalize|finalize|rotate> <regatta_id> [request.json] [--races RANGE]";

struct CliArgs {
    db_path: Option<String>,
    json_log: bool,
    races: Option<String>,
    positional: Vec<String>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut cli = CliArgs {
        db_path: None,
        json_log: false,
        races: None,
        positional: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => cli.db_path = Some(args.next().context("--db 缺少路径")?),
            "--races" => cli.races = Some(args.next().context("--races 缺少区间")?),
            "--json-log" => cli.json_log = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ => cli.positional.push(arg),
        }
    }
    Ok(cli)
}

/// 数据库路径: 命令行 > 环境变量 > 用户数据目录
fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./regatta.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("regatta-scoring");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("regatta.db");
        }
    }
    path.to_string_lossy().to_string()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = parse_args()?;
    logging::init(cli.json_log);

    let (command, regatta_id) = match cli.positional.as_slice() {
        [command, regatta_id, ..] => (command.as_str(), regatta_id.as_str()),
        _ => bail!(USAGE),
    };

    let db_path = cli.db_path.clone().unwrap_or_else(default_db_path);
    tracing::info!("{} v{}, 数据库: {}", APP_NAME, VERSION, db_path);

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone())
        .and_then(|m| m.load_engine_config())
        .map_err(|e| anyhow::anyhow!("加载配置失败: {}", e))?;
    let repo = Arc::new(SqliteRegattaRepository::from_connection(conn));
    let api = ScoringApi::new(repo, config, None);

    match command {
        "rescore" => print_json(&api.rescore(regatta_id)?)?,
        "check-finalize" => print_json(&api.check_finalizable(regatta_id)?)?,
        "finalize" => print_json(&api.finalize(regatta_id)?)?,
        "rotate" => {
            let request_path = cli
                .positional
                .get(2)
                .context("rotate 需要请求文件路径")?;
            let content = std::fs::read_to_string(request_path)
                .with_context(|| format!("无法读取轮换请求: {}", request_path))?;
            let mut request: RotationRequest =
                serde_json::from_str(&content).context("轮换请求格式错误")?;

            if let Some(races) = &cli.races {
                // 无法解析的区间按空集处理, 交由轮换校验拒绝
                let range = parse_range(races);
                if range.is_empty() {
                    tracing::warn!("场次区间为空或无法解析: {}", races);
                }
                request.races = range.into_numbers();
            }
            print_json(&api.generate_rotation(regatta_id, &request)?)?
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
