use clap::Parser as ClapParser;
use std::process;

use latte::{
    HeapCreateInfo, Number, ObjectId, Runtime, RuntimeCreateInfo, RuntimeError,
    primitives,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum number of nested method activations
    #[arg(long, default_value_t = 10_000)]
    max_depth: usize,

    /// Initial bucket count of every slot table
    #[arg(long, default_value_t = latte::DEFAULT_BUCKETS)]
    buckets: usize,

    /// Initial bucket count of every activation scope
    #[arg(long, default_value_t = latte::SCOPE_BUCKETS)]
    scope_buckets: usize,

    /// Do not install stdin/stdout/stderr on Sys
    #[arg(long)]
    no_stdio: bool,

    /// Print the native primitive table and exit
    #[arg(long)]
    list_primitives: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level),
    )
    .init();

    if cli.list_primitives {
        for desc in primitives::default_primitives() {
            let more = if desc.variadic { "+" } else { "" };
            println!("{:<16} {}{more}", desc.name, desc.arity);
        }
        return;
    }

    let mut vm = Runtime::new(RuntimeCreateInfo {
        heap: HeapCreateInfo {
            slot_buckets: cli.buckets,
            scope_buckets: cli.scope_buckets,
            ..HeapCreateInfo::default()
        },
        max_call_depth: cli.max_depth,
        standard_streams: !cli.no_stdio,
    });
    log::info!("bootstrapped {} objects", vm.heap().len());

    if let Err(err) = demo(&mut vm) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Sends `countdown` to a fresh object whose method counts down through the
/// native `if` and writes each step to `stdout` (or to nowhere with
/// `--no-stdio`).
fn demo(vm: &mut Runtime) -> Result<(), RuntimeError> {
    let special = *vm.special();
    let greeter = vm.clone_object(special.object);

    let countdown = vm.make_fn("countdown", |vm, frame| {
        let Some(n) = vm.argument(frame, 1) else {
            return Ok(vm.special().nil);
        };
        let value = vm.expect_number(n)?;
        let label = vm.make_text(format!("{value}"));
        write_line(vm, label)?;

        let kernel = vm.special().kernel;
        let receiver = frame.receiver;
        let done = matches!(value, Number::Int(i) if i <= 0);
        let stop = vm.boolean(done);
        let finish = vm.make_fn("finish", |vm, _| Ok(vm.special().nil));
        let again = vm.make_fn("again", move |vm, _| {
            let step = vm.make_number(Number::Int(-1));
            let next = vm.send_named(kernel, "numberAdd", &[n, step])?;
            vm.send_named(receiver, "countdown", &[next])
        });
        vm.send_named(kernel, "if", &[stop, finish, again])
    });
    let countdown_name = vm.intern("countdown");
    vm.put(greeter, countdown_name, countdown);

    let start = vm.make_number(Number::Int(3));
    vm.send(greeter, countdown_name, &[start])?;
    Ok(())
}

fn write_line(vm: &mut Runtime, text: ObjectId) -> Result<(), RuntimeError> {
    let stdout = vm.names().stdout;
    let Some(stream) = vm.get(vm.special().sys, stdout) else {
        return Ok(());
    };
    let kernel = vm.special().kernel;
    vm.send_named(kernel, "streamWriteLine", &[stream, text])?;
    Ok(())
}
