use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

fn ish(script: &str) -> Output {
	Command::new(env!("CARGO_BIN_EXE_ish"))
		.arg("-c")
		.arg(script)
		.env("ISH_TEST_VAR", "from env")
		.output()
		.expect("spawn ish")
}

fn ish_with(script: &str, vars: &[(&str, &str)]) -> Output {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_ish"));
	cmd.arg("-c").arg(script);
	for &(key, value) in vars {
		cmd.env(key, value);
	}
	cmd.output().expect("spawn ish")
}

fn stdout_of(script: &str) -> String {
	String::from_utf8(ish(script).stdout).expect("utf8")
}

fn stderr_of(script: &str) -> String {
	String::from_utf8(ish(script).stderr).expect("utf8")
}

fn status_of(script: &str) -> i32 {
	ish(script).status.code().expect("exited normally")
}

fn scratch(name: &str) -> PathBuf {
	let dir = std::env::temp_dir().join(format!("ish_cli_{}_{}", std::process::id(), name));
	let _ = fs::remove_dir_all(&dir);
	fs::create_dir_all(&dir).expect("create scratch dir");
	dir
}

macro_rules! stdout_test {
	($name:ident, $script:expr, $expected:expr) => {
		#[test]
		fn $name() {
			assert_eq!(stdout_of($script), $expected, "script: {}", $script);
		}
	};
}

// ── Expansion and quoting ──

stdout_test!(echo_words, "echo hello   world", "hello world\n");
stdout_test!(quotes_keep_blanks, "echo 'a   b' \"c\td\"", "a   b c\td\n");
stdout_test!(env_variable, "echo $ISH_TEST_VAR", "from env\n");
stdout_test!(unset_variable_is_empty, "echo [$ISH_SURELY_UNSET_VAR]", "[]\n");
stdout_test!(status_variable, "false\necho $?", "1\n");
stdout_test!(status_after_success, "true\necho $?", "0\n");
stdout_test!(lone_dollar, "echo $ 5", "$ 5\n");

// ── Pipelines ──

#[test]
fn pipe_delivers_exact_bytes() {
	let out = ish("echo hi | wc -c");
	assert_eq!(out.status.code(), Some(0));
	assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "3");
}

#[test]
fn long_pipeline_matches_direct_output() {
	let dir = scratch("pipeline");
	let direct = dir.join("direct");
	let piped = dir.join("piped");
	let script = format!(
		"seq 1 20000 > {}\nseq 1 20000 | cat | cat | cat > {}",
		direct.display(),
		piped.display(),
	);
	assert_eq!(status_of(&script), 0);
	let direct = fs::read(direct).expect("direct output");
	let piped = fs::read(piped).expect("piped output");
	assert!(direct.len() > 64 * 1024);
	assert_eq!(direct, piped);
	let _ = fs::remove_dir_all(dir);
}

stdout_test!(pipe_status_is_last_stage, "false | true\necho $?", "0\n");
stdout_test!(pipe_into_failing_stage, "echo x | false\necho $?", "1\n");

// ── Redirection ──

#[test]
fn output_redirect_truncates_and_input_redirect_reads() {
	let dir = scratch("redirect");
	let file = dir.join("out.txt");
	fs::write(&file, "old contents that are longer\n").expect("seed file");
	let script = format!(
		"echo fresh > {0}\ncat < {0}\nwc -l < {0} > {0}.count",
		file.display(),
	);
	assert_eq!(stdout_of(&script), "fresh\n");
	assert_eq!(fs::read_to_string(&file).unwrap(), "fresh\n");
	let count = fs::read_to_string(dir.join("out.txt.count")).unwrap();
	assert_eq!(count.trim(), "1");
	let _ = fs::remove_dir_all(dir);
}

#[test]
fn missing_input_file_fails_only_that_stage() {
	let out = ish("cat < /nonexistent/ish/input\necho still here");
	assert_eq!(String::from_utf8_lossy(&out.stdout), "still here\n");
	assert!(String::from_utf8_lossy(&out.stderr).contains("/nonexistent/ish/input"));
	assert_eq!(status_of("cat < /nonexistent/ish/input"), 1);
}

// ── Logical AND ──

stdout_test!(and_chain_runs_all, "echo a && echo b && echo c", "a\nb\nc\n");
stdout_test!(false_short_circuits, "false && echo unreachable", "");

#[test]
fn failed_head_skips_rest_and_keeps_status() {
	let out = ish("sh -c 'exit 3' && echo b && echo c");
	assert!(out.stdout.is_empty());
	assert_eq!(out.status.code(), Some(3));
	assert_eq!(status_of("false && echo unreachable"), 1);
}

// ── Errors in children ──

#[test]
fn unknown_command() {
	let out = ish("ish_no_such_command_xyz\necho after");
	assert_eq!(String::from_utf8_lossy(&out.stdout), "after\n");
	assert!(String::from_utf8_lossy(&out.stderr).contains("ish_no_such_command_xyz: command not found"));
	assert_eq!(status_of("ish_no_such_command_xyz"), 127);
}

stdout_test!(killed_child_status, "sh -c 'kill -9 $$'\necho $?", "137\n");

// ── Conditionals ──

stdout_test!(if_true_runs_then, "if true then echo X else echo Y fi", "X\n");
stdout_test!(if_false_runs_else, "if false then echo X else echo Y fi", "Y\n");
stdout_test!(if_false_without_else, "if false then echo X fi", "");
stdout_test!(if_blocks_are_chains, "if true then echo a && echo b fi", "a\nb\n");
stdout_test!(if_condition_pipeline, "if echo hi | grep -q hi then echo found fi", "found\n");
stdout_test!(if_quoted_keyword, "if true then echo 'then fi' fi", "then fi\n");

#[test]
fn if_blocks_are_expanded_twice() {
	let vars = [("INDIRECT", "$TARGET"), ("TARGET", "hit")];
	let out = ish_with("if true then echo $INDIRECT fi", &vars);
	assert_eq!(String::from_utf8_lossy(&out.stdout), "hit\n");
	let out = ish_with("echo $INDIRECT", &vars);
	assert_eq!(String::from_utf8_lossy(&out.stdout), "$TARGET\n");
}

#[test]
fn if_block_status_reference() {
	// `$?` written on the line is replaced before the condition runs
	assert_eq!(stdout_of("false\nif true then echo $? fi"), "1\n");
	// one that only appears after the first pass sees the condition's status
	let out = ish_with("if false then echo no else echo $STATUS_REF fi", &[("STATUS_REF", "$?")]);
	assert_eq!(String::from_utf8_lossy(&out.stdout), "1\n");
}

#[test]
fn malformed_if_is_reported() {
	let out = ish("if true echo x\necho next");
	assert_eq!(String::from_utf8_lossy(&out.stdout), "next\n");
	assert!(String::from_utf8_lossy(&out.stderr).contains("missing 'then' or 'fi'"));
	assert_eq!(status_of("if true then echo x"), 2);
}

#[test]
fn nested_if_is_rejected() {
	let err = stderr_of("if true then if true then echo x fi fi");
	assert!(err.contains("nested 'if'"), "stderr: {}", err);
}

// ── Built-ins ──

stdout_test!(cd_changes_directory, "cd /\npwd", "/\n");

#[test]
fn cd_without_argument_goes_home() {
	let home = fs::canonicalize(std::env::var("HOME").expect("HOME set")).expect("HOME exists");
	assert_eq!(stdout_of("cd\npwd").trim_end(), home.display().to_string());
}

stdout_test!(failed_cd_stops_chain, "cd /nonexistent/ish && echo no", "");
stdout_test!(failed_cd_continues_segment, "cd /nonexistent/ish | echo still", "still\n");
stdout_test!(builtin_last_in_pipeline_sets_status, "true | cd /nonexistent/ish\necho $?", "1\n");
stdout_test!(child_after_builtin_sets_status, "cd /nonexistent/ish | false\necho $?", "1\n");
stdout_test!(builtin_after_failing_child_sets_status, "false | cd /\necho $?", "0\n");
stdout_test!(exit_stops_input, "echo a\nexit\necho b", "a\n");

#[test]
fn exit_status_is_zero() {
	assert_eq!(status_of("false\nexit 5"), 0);
}

#[test]
fn failed_cd_is_reported() {
	assert!(stderr_of("cd /nonexistent/ish").contains("cd: /nonexistent/ish"));
}

stdout_test!(
	interrupt_is_reported_and_ignored,
	"sh -c 'kill -INT ${PPID}'\necho after",
	"\nCaught Ctrl+C - shell remains active\nafter\n"
);

// ── Jobs ──

#[test]
fn background_does_not_block() {
	let started = Instant::now();
	// the sleeper must not hold our stdout pipe open, or `output` waits for it
	let out = Command::new(env!("CARGO_BIN_EXE_ish"))
		.args(["-c", "sleep 3 > /dev/null &\necho done"])
		.stderr(Stdio::null())
		.output()
		.expect("spawn ish");
	assert_eq!(String::from_utf8_lossy(&out.stdout), "done\n");
	assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn background_status_is_untouched() {
	assert_eq!(stdout_of("false\nsleep 1 &\necho $?"), "1\n");
}

#[test]
fn jobs_lists_running_background_work() {
	let out = stdout_of("sleep 1 &\njobs");
	assert!(out.starts_with("[1] "), "jobs output: {}", out);
	assert!(out.ends_with(" Running    sleep 1 &\n"), "jobs output: {}", out);
}

#[test]
fn finished_jobs_are_reaped() {
	assert_eq!(stdout_of("true &\nsleep 1\njobs"), "");
}

#[test]
fn several_finished_jobs_are_reaped_together() {
	let out = stdout_of("true &\ntrue &\ntrue &\nsleep 1 &\nsleep 0.5\njobs");
	assert_eq!(out.lines().count(), 1, "jobs output: {}", out);
	assert!(out.starts_with("[4] "), "jobs output: {}", out);
	assert!(out.ends_with(" Running    sleep 1 &\n"), "jobs output: {}", out);
}

stdout_test!(fg_waits_for_job, "sleep 1 &\nfg 1\necho $?", "sleep 1 &\n0\n");

#[test]
fn fg_rejects_bad_index() {
	let out = ish("fg 3");
	assert!(String::from_utf8_lossy(&out.stderr).contains("fg: no such job"));
	assert_eq!(out.status.code(), Some(1));
}

#[test]
fn job_table_capacity_is_respected() {
	let out = Command::new(env!("CARGO_BIN_EXE_ish"))
		.args(["--max-jobs", "2", "-c", "sleep 1 &\nsleep 1 &\nsleep 1 &\njobs"])
		.output()
		.expect("spawn ish");
	let listed = String::from_utf8_lossy(&out.stdout);
	assert_eq!(listed.lines().count(), 2, "jobs output: {}", listed);
}
