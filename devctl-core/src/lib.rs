pub mod command;
pub mod config;
pub mod error;
pub mod process;

pub use command::{Action, CommandLine, CommandSpec, HostOs, Signal};
pub use config::{AdapterConfig, Config, ConfigLoader, LogLayout, LogMode, LogSettings};
pub use error::{Error, Result};
pub use process::{ExitStatus, ProcessBuilder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_name_validation() {
        use config::validate_adapter_name;

        assert!(validate_adapter_name("api").is_ok());
        assert!(validate_adapter_name("web-frontend").is_ok());
        assert!(validate_adapter_name("worker_2").is_ok());
        assert!(validate_adapter_name("docs.site").is_ok());

        assert!(validate_adapter_name("").is_err());
        assert!(validate_adapter_name("   ").is_err());
        assert!(validate_adapter_name("..").is_err());
        assert!(validate_adapter_name("a/b").is_err());
        assert!(validate_adapter_name("a\\b").is_err());
        assert!(validate_adapter_name("c:api").is_err());
        assert!(validate_adapter_name(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::PrematureExit {
            name: "api".to_string(),
            code: "1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "api exited before becoming ready (exit code: 1)"
        );

        let err = Error::ReadinessTimeout {
            name: "web".to_string(),
            timeout_ms: 500,
        };
        assert_eq!(err.to_string(), "web did not become ready within 500ms");
    }
}
