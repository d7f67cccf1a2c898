fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let library_root = std::env::args_os().nth(1).map(std::path::PathBuf::from);
    cadence_lib::run(library_root)
}
