//! Runner trait and the `db_bench` subprocess implementation.

use crate::args::BenchArgs;
use crate::error::BenchmarkFailure;
use crate::output::{parse_output, primary};
use crate::result::BenchmarkResult;
use crate::sampler::ResourceSampler;
use crate::workspace::WorkloadDir;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tuneforge_options::format::render_options_file;
use tuneforge_options::ResolvedConfiguration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const OUTPUT_TAIL_LINES: usize = 20;
const OPTIONS_FILE_NAME: &str = "OPTIONS.ini";
const TRACE_FILE_NAME: &str = "tracefile";

/// Executes one benchmark run for a fully resolved configuration.
pub trait BenchmarkRunner {
    /// Name of this runner.
    fn name(&self) -> &str;

    /// Run the workload. `label` names the run's artifacts.
    fn run(
        &mut self,
        config: &ResolvedConfiguration,
        args: &BenchArgs,
        label: &str,
    ) -> Result<BenchmarkResult, BenchmarkFailure>;
}

/// Settings for [`DbBenchRunner`].
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Path to the benchmark executable.
    pub executable: PathBuf,
    /// Database directory; wiped before and removed after each run.
    pub db_path: PathBuf,
    /// Value of `--benchmarks`, also used to pick the primary metric.
    pub benchmarks: String,
    /// Parent directory for per-run artifacts (options file, raw output).
    pub artifacts_dir: PathBuf,
    /// Hard limit on preload and benchmark wall time.
    pub timeout: Duration,
    pub sample_interval: Duration,
    /// Shell command run in the fresh workload before the benchmark.
    pub preload_cmd: Option<String>,
    /// Ask the benchmark to record an operation trace into the run directory.
    pub record_trace: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("db_bench"),
            db_path: PathBuf::from("/tmp/tuneforge/db"),
            benchmarks: "fillrandom".into(),
            artifacts_dir: PathBuf::from("output/runs"),
            timeout: Duration::from_secs(30 * 60),
            sample_interval: Duration::from_secs(1),
            preload_cmd: None,
            record_trace: false,
        }
    }
}

/// Runs a `db_bench` compatible executable as a subprocess.
pub struct DbBenchRunner {
    options: RunnerOptions,
}

impl DbBenchRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Full argument list: fixed flags, then configuration flags overlaid
    /// with the workload arguments (workload arguments win).
    ///
    /// The trace is written next to the options file in `run_dir`, outside
    /// the workload directory that is removed after the run.
    pub fn command_args(&self, config: &ResolvedConfiguration, args: &BenchArgs, run_dir: &Path) -> Vec<String> {
        let mut flags = BenchArgs::new();
        if let Some(bench) = config.section(tuneforge_options::Section::DbBench) {
            for (key, value) in bench {
                flags.set(key.clone(), value.to_string());
            }
        }
        flags.merge(args);

        let mut out = vec![
            format!("--db={}", self.options.db_path.display()),
            format!("--options_file={}", run_dir.join(OPTIONS_FILE_NAME).display()),
            format!("--benchmarks={}", self.options.benchmarks),
        ];
        if self.options.record_trace {
            out.push(format!("--trace_file={}", run_dir.join(TRACE_FILE_NAME).display()));
        }
        out.extend(flags.to_flags());
        out
    }

    fn preload(&self, command: &str, run_dir: &Path) -> Result<(), BenchmarkFailure> {
        let log_path = run_dir.join("preload.log");
        info!(command, "running preload command");
        let (stdout, stderr) = log_handles(&log_path)?;
        let mut child = own_process_group(Command::new("sh").arg("-c").arg(command))
            .env("DB_PATH", &self.options.db_path)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| BenchmarkFailure::Preload {
                detail: format!("spawn failed: {}", e),
            })?;

        match wait_with_timeout(&mut child, self.options.timeout) {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(status)) => Err(BenchmarkFailure::Preload {
                detail: format!("{}: {}", status, output_tail(&log_path)),
            }),
            Ok(None) => Err(BenchmarkFailure::Preload {
                detail: format!("timed out after {:?}", self.options.timeout),
            }),
            Err(e) => Err(BenchmarkFailure::Preload {
                detail: format!("wait failed: {}", e),
            }),
        }
    }
}

impl BenchmarkRunner for DbBenchRunner {
    fn name(&self) -> &str {
        "db_bench"
    }

    fn run(
        &mut self,
        config: &ResolvedConfiguration,
        args: &BenchArgs,
        label: &str,
    ) -> Result<BenchmarkResult, BenchmarkFailure> {
        let run_dir = self.options.artifacts_dir.join(label);
        fs::create_dir_all(&run_dir).map_err(|source| workspace_err(&run_dir, source))?;

        let options_file = run_dir.join(OPTIONS_FILE_NAME);
        fs::write(&options_file, render_options_file(config))
            .map_err(|source| workspace_err(&options_file, source))?;

        // Held until the end of the run; dropping it tears the workload down.
        let workload = WorkloadDir::prepare(&self.options.db_path)
            .map_err(|source| workspace_err(&self.options.db_path, source))?;

        if let Some(cmd) = self.options.preload_cmd.as_deref().filter(|c| !c.trim().is_empty()) {
            self.preload(cmd, &run_dir)?;
        }

        let trace_file = run_dir.join(TRACE_FILE_NAME);
        if self.options.record_trace {
            remove_stale(&trace_file).map_err(|source| workspace_err(&trace_file, source))?;
        }
        let argv = self.command_args(config, args, &run_dir);
        let output_path = run_dir.join("db_bench.log");
        let (stdout, stderr) = log_handles(&output_path)?;
        info!(
            run = label,
            executable = %self.options.executable.display(),
            flags = argv.len(),
            "launching benchmark"
        );
        debug!(argv = ?argv, "benchmark command line");

        let started = Instant::now();
        let mut child = own_process_group(&mut Command::new(&self.options.executable))
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| BenchmarkFailure::Spawn {
                program: self.options.executable.display().to_string(),
                source,
            })?;

        let sampler = ResourceSampler::start(child.id(), self.options.sample_interval);
        let waited = wait_with_timeout(&mut child, self.options.timeout);
        let samples = sampler.stop();
        let wall_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        drop(workload);

        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                return Err(BenchmarkFailure::Timeout {
                    after: self.options.timeout,
                })
            }
            Err(e) => {
                return Err(BenchmarkFailure::NonZeroExit {
                    code: None,
                    output_tail: format!("wait failed: {}", e),
                })
            }
        };

        if !status.success() {
            return Err(BenchmarkFailure::NonZeroExit {
                code: status.code(),
                output_tail: output_tail(&output_path),
            });
        }

        let text = fs::read_to_string(&output_path)
            .map_err(|source| workspace_err(&output_path, source))?;
        let workloads = parse_output(&text);
        let main = primary(&workloads, &self.options.benchmarks)
            .cloned()
            .ok_or_else(|| BenchmarkFailure::MissingMetric {
                output: output_path.clone(),
            })?;

        let mut result = BenchmarkResult::new(&main, workloads, samples, wall_time_ms, &output_path);
        if self.options.record_trace && trace_file.is_file() {
            result = result.with_trace(trace_file);
        }
        info!(
            run = label,
            ops_per_sec = result.ops_per_sec,
            avg_cpu_percent = result.avg_cpu_percent,
            avg_memory_mb = result.avg_memory_mb,
            wall_time_ms,
            "benchmark finished"
        );
        Ok(result)
    }
}

/// Make the spawned process lead a new process group so a timeout can take
/// down everything it started.
fn own_process_group(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// Wait for `child`, killing its process group and reaping it once
/// `timeout` elapses. Returns `Ok(None)` on timeout.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            kill_group(child);
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(timeout));
    }
}

/// SIGKILL the group led by `child`. Must run before the child is reaped,
/// while its pid still names the group.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: plain syscall; a negative pid addresses the process group.
            let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
            if rc == 0 {
                return;
            }
            debug!(pgid, error = %io::Error::last_os_error(), "process group kill failed");
        }
    }
    let _ = child.kill();
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn log_handles(path: &Path) -> Result<(File, File), BenchmarkFailure> {
    let stdout = File::create(path).map_err(|source| workspace_err(path, source))?;
    let stderr = stdout.try_clone().map_err(|source| workspace_err(path, source))?;
    Ok((stdout, stderr))
}

fn output_tail(path: &Path) -> String {
    let text = fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}

fn workspace_err(path: &Path, source: io::Error) -> BenchmarkFailure {
    BenchmarkFailure::Workspace {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tuneforge_options::seed::default_seed;

    struct Fixture {
        _root: tempfile::TempDir,
        runner: DbBenchRunner,
        db_path: PathBuf,
    }

    fn fixture(script: &str, timeout: Duration) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let exe = root.path().join("fake_db_bench.sh");
        fs::write(&exe, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        let db_path = root.path().join("db");
        let runner = DbBenchRunner::new(RunnerOptions {
            executable: exe,
            db_path: db_path.clone(),
            benchmarks: "fillrandom".into(),
            artifacts_dir: root.path().join("runs"),
            timeout,
            sample_interval: Duration::from_millis(20),
            preload_cmd: None,
            record_trace: false,
        });
        Fixture {
            _root: root,
            runner,
            db_path,
        }
    }

    fn resolved() -> ResolvedConfiguration {
        default_seed().resolve().unwrap()
    }

    #[test]
    fn test_successful_run_parses_throughput() {
        let mut fx = fixture(
            "echo 'fillrandom   :       2.000 micros/op 500000 ops/sec 2.0 seconds 1000000 operations;   55.3 MB/s'",
            Duration::from_secs(10),
        );
        let result = fx.runner.run(&resolved(), &BenchArgs::new(), "seed").unwrap();
        assert_eq!(result.ops_per_sec, 500000.0);
        assert_eq!(result.mb_per_sec, Some(55.3));
        assert!(result.output_path.exists());
        assert!(!fx.db_path.exists(), "workload directory must be torn down");
    }

    #[test]
    fn test_non_zero_exit_is_failure() {
        let mut fx = fixture("echo 'Invalid argument: options file'; exit 3", Duration::from_secs(10));
        let err = fx.runner.run(&resolved(), &BenchArgs::new(), "crash").unwrap_err();
        match err {
            BenchmarkFailure::NonZeroExit { code, output_tail } => {
                assert_eq!(code, Some(3));
                assert!(output_tail.contains("Invalid argument"));
            }
            other => panic!("unexpected failure: {other}"),
        }
        assert!(!fx.db_path.exists());
    }

    #[test]
    fn test_missing_metric_is_failure() {
        let mut fx = fixture("echo 'RocksDB: version 8.8.1'", Duration::from_secs(10));
        let err = fx.runner.run(&resolved(), &BenchArgs::new(), "nometric").unwrap_err();
        assert!(matches!(err, BenchmarkFailure::MissingMetric { .. }));
    }

    #[test]
    fn test_timeout_kills_process() {
        let mut fx = fixture("sleep 30", Duration::from_millis(300));
        let started = Instant::now();
        let err = fx.runner.run(&resolved(), &BenchArgs::new(), "slow").unwrap_err();
        assert!(matches!(err, BenchmarkFailure::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!fx.db_path.exists());
    }

    #[test]
    fn test_flags_and_options_file_reach_executable() {
        let mut fx = fixture(
            "for a in \"$@\"; do echo \"arg $a\"; done\necho 'fillrandom : 1.0 micros/op 1000 ops/sec'",
            Duration::from_secs(10),
        );
        let args = BenchArgs::new().with("num", "5000").with("bloom_bits", "16");
        let result = fx.runner.run(&resolved(), &args, "flags").unwrap();

        let log = fs::read_to_string(&result.output_path).unwrap();
        assert!(log.contains("arg --benchmarks=fillrandom"));
        assert!(log.contains("arg --num=5000"));
        assert!(log.contains("arg --bloom_bits=16"), "workload args override config flags");
        assert!(!log.contains("arg --bloom_bits=10"));

        let options = fs::read_to_string(result.output_path.with_file_name(OPTIONS_FILE_NAME)).unwrap();
        assert!(options.contains("[DBOptions]"));
    }

    /// Zombies awaiting their reaper count as dead.
    fn alive(pid: &str) -> bool {
        let pid: libc::pid_t = pid.trim().parse().unwrap();
        match fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => stat.rsplit(')').next().and_then(|rest| rest.split_whitespace().next()) != Some("Z"),
            Err(_) if Path::new("/proc/self").exists() => false,
            // SAFETY: signal 0 only checks that the pid exists.
            Err(_) => unsafe { libc::kill(pid, 0) == 0 },
        }
    }

    fn read_pid(path: &Path) -> String {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(pid) = fs::read_to_string(path) {
                if !pid.trim().is_empty() {
                    return pid;
                }
            }
            assert!(Instant::now() < deadline, "{} never written", path.display());
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_timeout_kills_benchmark_descendants() {
        let root = tempfile::tempdir().unwrap();
        let pid_file = root.path().join("bench.pid");
        let mut fx = fixture(
            &format!("sleep 41 &\necho $! > {}\nwait", pid_file.display()),
            Duration::from_millis(300),
        );
        let err = fx.runner.run(&resolved(), &BenchArgs::new(), "slow_tree").unwrap_err();
        assert!(matches!(err, BenchmarkFailure::Timeout { .. }));
        assert!(err.to_string().contains("300ms"), "{}", err);

        let pid = read_pid(&pid_file);
        thread::sleep(Duration::from_millis(100));
        assert!(!alive(&pid), "benchmark grandchild {} survived the timeout", pid.trim());
    }

    #[test]
    fn test_timeout_kills_preload_descendants() {
        let root = tempfile::tempdir().unwrap();
        let pid_file = root.path().join("preload.pid");
        let mut fx = fixture("echo 'fillrandom : 1.0 micros/op 1000 ops/sec'", Duration::from_millis(300));
        fx.runner.options.preload_cmd = Some(format!("sleep 43 & echo $! > {}; wait", pid_file.display()));
        let err = fx.runner.run(&resolved(), &BenchArgs::new(), "slow_preload").unwrap_err();
        assert!(matches!(err, BenchmarkFailure::Preload { .. }));

        let pid = read_pid(&pid_file);
        thread::sleep(Duration::from_millis(100));
        assert!(!alive(&pid), "preload grandchild {} survived the timeout", pid.trim());
    }

    #[test]
    fn test_recorded_trace_is_kept_outside_workload() {
        let mut fx = fixture(
            "for a in \"$@\"; do case $a in --trace_file=*) echo 'put key1' > \"${a#--trace_file=}\";; esac; done\necho 'fillrandom : 1.0 micros/op 1000 ops/sec'",
            Duration::from_secs(10),
        );
        fx.runner.options.record_trace = true;
        let result = fx.runner.run(&resolved(), &BenchArgs::new(), "traced").unwrap();

        let trace = result.trace_path.expect("trace recorded");
        assert!(trace.ends_with("traced/tracefile"));
        assert_eq!(fs::read_to_string(&trace).unwrap().trim(), "put key1");
        assert!(!fx.db_path.exists());
    }

    #[test]
    fn test_failed_preload_is_failure() {
        let mut fx = fixture("echo 'fillrandom : 1.0 micros/op 1000 ops/sec'", Duration::from_secs(10));
        fx.runner.options.preload_cmd = Some("exit 1".into());
        let err = fx.runner.run(&resolved(), &BenchArgs::new(), "preload").unwrap_err();
        assert!(matches!(err, BenchmarkFailure::Preload { .. }));
    }
}
