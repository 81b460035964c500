//! Runs embedded `PostgreSQL` lifecycle steps for the integration suite.
//!
//! ```text
//! pg_worker <setup|start|stop> <payload.json>
//! ```
//!
//! `pg_embedded_setup_unpriv` invokes this helper through
//! `PG_EMBEDDED_WORKER` when the tests run as root; the helper then drops to
//! `nobody` because `initdb` refuses to run as the superuser. The payload is
//! a serialised [`WorkerPayload`].

#[cfg(unix)]
mod unix {
    use camino::{Utf8Path, Utf8PathBuf};
    use citool::load_test::domain::shell_escape;
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use thiserror::Error;

    const REEXEC_MARKER: &str = "CITOOL_PG_WORKER_REEXEC";
    const TRUSTED_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

    #[derive(Debug, Error)]
    enum WorkerError {
        #[error("invalid arguments: {0}")]
        Usage(String),
        #[error("cannot read payload {path}: {source}")]
        Payload { path: Utf8PathBuf, source: BoxError },
        #[error("cannot drop privileges: {0}")]
        Privileges(String),
        #[error("postgres {step} failed: {message}")]
        Postgres { step: &'static str, message: String },
        #[error("runtime init failed: {0}")]
        Runtime(#[source] io::Error),
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Setup,
        Start,
        Stop,
    }

    impl Step {
        fn parse(token: &str) -> Result<Self, WorkerError> {
            match token {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(WorkerError::Usage(format!(
                    "unknown operation '{other}'; expected setup, start or stop"
                ))),
            }
        }

        const fn name(self) -> &'static str {
            match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            }
        }
    }

    pub fn run() -> Result<(), BoxError> {
        let args = utf8_args()?;
        if Uid::effective().is_root() && env::var_os(REEXEC_MARKER).is_none() {
            let status = reexec_unprivileged(&args)?;
            std::process::exit(status.code().unwrap_or(1));
        }

        let (step, payload_path) = parse_args(&args)?;
        let payload = read_payload(&payload_path)?;
        drop_privileges()?;
        let settings = payload.settings.into_settings().map_err(|err| WorkerError::Postgres {
            step: step.name(),
            message: err.to_string(),
        })?;
        apply_environment(&payload.environment);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WorkerError::Runtime)?;
        runtime.block_on(drive(step, PostgreSQL::new(settings)))?;
        Ok(())
    }

    fn utf8_args() -> Result<Vec<Utf8PathBuf>, WorkerError> {
        env::args_os()
            .map(|arg| {
                arg.into_string()
                    .map(Utf8PathBuf::from)
                    .map_err(|_| WorkerError::Usage("argument is not valid UTF-8".to_owned()))
            })
            .collect()
    }

    fn parse_args(args: &[Utf8PathBuf]) -> Result<(Step, Utf8PathBuf), WorkerError> {
        match args {
            [_, step, payload] => Ok((Step::parse(step.as_str())?, payload.clone())),
            [_] | [] => Err(WorkerError::Usage("missing operation argument".to_owned())),
            [_, _] => Err(WorkerError::Usage("missing config path argument".to_owned())),
            [_, _, _, extra, ..] => {
                Err(WorkerError::Usage(format!("unexpected extra argument: {extra}")))
            }
        }
    }

    fn read_payload(path: &Utf8Path) -> Result<WorkerPayload, WorkerError> {
        let failure = |source: BoxError| WorkerError::Payload {
            path: path.to_path_buf(),
            source,
        };
        let (dir, relative) = ambient_dir_and_path(path).map_err(|err| failure(err.into()))?;
        let mut file = dir
            .open(relative.as_std_path())
            .map_err(|err| failure(Box::new(err)))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|err| failure(Box::new(err)))?;
        serde_json::from_slice(&bytes).map_err(|err| failure(Box::new(err)))
    }

    fn reexec_unprivileged(args: &[Utf8PathBuf]) -> Result<ExitStatus, WorkerError> {
        let exe = env::current_exe().map_err(WorkerError::Runtime)?;
        let forwarded = args.iter().skip(1).map(|arg| arg.as_std_path());
        match Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(&exe)
            .args(forwarded)
            .env(REEXEC_MARKER, "1")
            .env("PATH", TRUSTED_PATH)
            .status()
        {
            Ok(status) => Ok(status),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let exe_text = exe.to_str().ok_or_else(|| {
                    WorkerError::Usage("executable path is not valid UTF-8".to_owned())
                })?;
                let mut script = format!("{REEXEC_MARKER}=1 exec {}", shell_escape(exe_text));
                for arg in args.iter().skip(1) {
                    script.push(' ');
                    script.push_str(&shell_escape(arg.as_str()));
                }
                Command::new("/bin/su")
                    .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
                    .arg(script)
                    .env("PATH", TRUSTED_PATH)
                    .status()
                    .map_err(|su_err| WorkerError::Privileges(su_err.to_string()))
            }
            Err(err) => Err(WorkerError::Privileges(err.to_string())),
        }
    }

    fn drop_privileges() -> Result<(), WorkerError> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let privileges = |err: nix::Error| WorkerError::Privileges(err.to_string());
        let user = User::from_name(UNPRIVILEGED_USER)
            .map_err(privileges)?
            .ok_or_else(|| WorkerError::Privileges(format!("user '{UNPRIVILEGED_USER}' not found")))?;
        let name = CString::new(user.name.clone())
            .map_err(|err| WorkerError::Privileges(err.to_string()))?;
        initgroups(&name, user.gid).map_err(privileges)?;
        setgid(user.gid).map_err(privileges)?;
        setuid(user.uid).map_err(privileges)?;

        // SAFETY: no other thread exists yet.
        unsafe {
            env::set_var("HOME", &user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: runs before the runtime starts its threads.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }

    async fn drive(step: Step, mut postgres: PostgreSQL) -> Result<(), WorkerError> {
        let failed = |err: postgresql_embedded::Error| WorkerError::Postgres {
            step: step.name(),
            message: err.to_string(),
        };
        match step {
            Step::Setup => {
                postgres.setup().await.map_err(failed)?;
                if !matches!(postgres.status(), Status::Started) {
                    postgres.start().await.map_err(failed)?;
                }
            }
            Step::Start => {
                if !matches!(postgres.status(), Status::Started) {
                    postgres.start().await.map_err(failed)?;
                }
                // The server must outlive this process.
                std::mem::forget(postgres);
            }
            Step::Stop => postgres.stop().await.map_err(failed)?,
        }
        Ok(())
    }
}

#[cfg(unix)]
fn main() -> Result<(), unix::BoxError> {
    unix::run()
}

#[cfg(not(unix))]
fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    Err("pg_worker is only supported on Unix".into())
}
