fn main() {
    #[cfg(feature = "cli")]
    lcwdelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("lcwdelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
