//! Records per-CPU scheduler jiffy counters from /proc/stat as knob
//! timelines and dumps them to stdout.
//!
//! Run with `cargo run --example record -- -c 0 -d 500 -i 50`.

use getopts::Options;
use knobtap::{
    Configuration, CpuMask, Device, Error, Knob, KnobAccess, Monotonic, Sample,
};
use log::info;
use std::{env, fs, io, thread, time::Duration};

const COLUMNS: &[(&str, &str, usize)] = &[
    ("user_jiffies", "time spent in user mode", 1),
    ("system_jiffies", "time spent in kernel mode", 3),
    ("idle_jiffies", "time spent idle", 4),
];

struct JiffyAccess;

impl KnobAccess for JiffyAccess {
    type Device = JiffyDevice;

    fn lookup(&self, name: &str) -> Result<Knob, Error> {
        COLUMNS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(n, d, _)| Knob::new(*n, *d))
            .ok_or_else(|| Error::UnknownKnob(name.to_string()))
    }

    fn device(&self, cpu: usize) -> Result<JiffyDevice, Error> {
        Ok(JiffyDevice { cpu })
    }
}

struct JiffyDevice {
    cpu: usize,
}

impl Device for JiffyDevice {
    fn read(&mut self, knob: &Knob) -> io::Result<u64> {
        let column = COLUMNS
            .iter()
            .find(|(n, _, _)| *n == knob.name())
            .map(|(_, _, c)| *c)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown column"))?;

        let stat = fs::read_to_string("/proc/stat")?;
        let prefix = format!("cpu{} ", self.cpu);
        let line = stat
            .lines()
            .find(|l| l.starts_with(&prefix))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cpu line missing"))?;

        line.split_whitespace()
            .nth(column)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad stat line"))
    }
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("c", "cpu", "CPU to sample (default 0)", "ID");
    opts.optopt("d", "duration", "how long to sample, in ms (default 500)", "MS");
    opts.optopt("i", "interval", "polling interval, in ms (default 50)", "MS");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => panic!("{}", f),
    };
    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return;
    }

    let cpu: usize = matches.opt_str("c").map_or(0, |v| v.parse().unwrap());
    let duration: u64 = matches.opt_str("d").map_or(500, |v| v.parse().unwrap());
    let interval: u64 = matches.opt_str("i").map_or(50, |v| v.parse().unwrap());

    // Registration is per-thread: pin ourselves to the CPU we want sampled.
    let mut mask = CpuMask::empty();
    mask.set(cpu);
    mask.apply().expect("failed to pin to the requested CPU");

    let plugin = Configuration::new()
        .interval(Duration::from_millis(interval))
        .build(JiffyAccess, Monotonic::new());

    let mut ids = Vec::new();
    for (name, _, _) in COLUMNS {
        let props = plugin.get_metric_properties(name).unwrap();
        info!("registering '{}' ({})", props.name, props.description);
        ids.push((name, plugin.add_metric(name).unwrap()));
    }

    thread::sleep(Duration::from_millis(duration));

    for (name, id) in ids {
        let mut samples: Vec<Sample> = Vec::new();
        plugin.get_all_values(id, &mut samples).unwrap();

        println!("{} on cpu{} ({} samples):", name, cpu, samples.len());
        for sample in samples {
            println!("  {} {}", sample.ticks(), sample.value());
        }
    }
}
