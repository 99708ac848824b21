use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use icongen::{IconGenerator, generator::find_project_root};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 从可执行文件所在目录向上查找 icons/logo.png, 找不到时退回到源码目录
    let root = std::env::current_exe()
        .ok()
        .and_then(|exe| find_project_root(&exe))
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    debug!("Project root: {}", root.display());

    IconGenerator::new(root).run()?;

    Ok(())
}
