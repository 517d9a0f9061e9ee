//! Command line arguments

use clap::{Parser, Subcommand};
use pdbp_foundation::PlatformConfig;
use std::path::PathBuf;

/// PDBP - plugin platform server
#[derive(Parser, Debug)]
#[command(name = "pdbp")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (merged over global and project config)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory scanned for plugin artifacts
    #[arg(long)]
    pub plugin_dir: Option<PathBuf>,

    /// Do not read or write the installed plugin state file
    #[arg(long)]
    pub no_persist: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Scan the plugin directory and print descriptors
    Discover {
        /// Directory to scan instead of the configured one
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

impl Args {
    /// 명령줄 값이 설정 파일과 환경 변수보다 우선
    pub fn apply_overrides(&self, config: &mut PlatformConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.plugin_dir {
            config.plugins.directory = dir.clone();
        }
        if self.no_persist {
            config.plugins.persist_state = false;
        }
        if self.debug {
            config.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let args = Args::parse_from([
            "pdbp",
            "--host",
            "0.0.0.0",
            "--port",
            "9090",
            "--plugin-dir",
            "/opt/plugins",
            "--no-persist",
        ]);
        let mut config = PlatformConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.server.bind_address(), "0.0.0.0:9090");
        assert_eq!(config.plugins.directory, PathBuf::from("/opt/plugins"));
        assert!(config.plugins.effective_state_file().is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_discover_subcommand() {
        let args = Args::parse_from(["pdbp", "discover", "--dir", "/tmp/plugins"]);
        match args.command {
            Some(Command::Discover { dir }) => assert_eq!(dir, Some(PathBuf::from("/tmp/plugins"))),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
