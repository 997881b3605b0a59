use std::{
    fmt::Display,
    io::{stdout, Write},
    sync::atomic::{AtomicBool, Ordering::SeqCst},
    time::Instant,
};

static CBCS: AtomicBool = AtomicBool::new(false);

pub fn ansi<T: Display, U: Display>(x: T, y: U) -> String {
    format!("\x1b[{y}m{x}\x1b[0m{}", esc())
}

pub fn set_cbcs(val: bool) {
    CBCS.store(val, SeqCst)
}

pub fn num_cs() -> i32 {
    if CBCS.load(SeqCst) {
        35
    } else {
        36
    }
}

fn esc() -> &'static str {
    if CBCS.load(SeqCst) {
        "\x1b[38;5;225m"
    } else {
        ""
    }
}

pub fn report_training_start(model: &str, epochs: usize, samples: usize, batch_size: usize) {
    let num_cs = num_cs();

    println!(
        "Training {} for {} epochs on {} samples (batch size {})",
        ansi(model, num_cs),
        ansi(epochs, num_cs),
        ansi(samples, num_cs),
        ansi(batch_size, num_cs),
    );
}

pub fn report_epoch_progress(epoch: usize, batches: usize, finished_batches: usize, epoch_timer: &Instant, samples: usize) {
    let num_cs = num_cs();
    let epoch_time = epoch_timer.elapsed().as_secs_f32();
    let pct = finished_batches as f32 / batches as f32;
    let samples_per_sec = samples as f32 / epoch_time;

    let seconds = epoch_time / pct - epoch_time;

    print!(
        "epoch {} [{}% ({}/{} batches, {} samples/sec)]\n\
        Estimated time to end of epoch: {}s     \x1b[F",
        ansi(epoch, num_cs),
        ansi(format!("{:.1}", pct * 100.0), 35),
        ansi(finished_batches, num_cs),
        ansi(batches, num_cs),
        ansi(format!("{samples_per_sec:.0}"), num_cs),
        ansi(format!("{seconds:.1}"), num_cs),
    );
    let _ = stdout().flush();
}

pub fn report_epoch_finished(epoch: usize, loss: f32, accuracy: Option<f32>, epoch_time: f32, total_time: f32) {
    let num_cs = num_cs();

    let accuracy = accuracy.map(|acc| format!(" | accuracy {}", ansi(format!("{acc:.4}"), num_cs))).unwrap_or_default();

    println!(
        "epoch {} | time {}s | loss {}{accuracy} | total time {}s",
        ansi(epoch, num_cs),
        ansi(format!("{epoch_time:.1}"), num_cs),
        ansi(format!("{loss:.6}"), num_cs),
        ansi(format!("{total_time:.1}"), num_cs),
    );
}

pub fn report_time_left(finished_epochs: usize, total_epochs: usize, total_time: f32) {
    let num_cs = num_cs();
    let pct = finished_epochs as f32 / total_epochs as f32;
    let time_left = total_time / pct - total_time;

    let (hours, minutes, seconds) = seconds_to_hms(time_left as u32);

    println!(
        "Estimated time remaining in training: {}h {}m {}s",
        ansi(hours, num_cs),
        ansi(minutes, num_cs),
        ansi(seconds, num_cs),
    );
}

pub fn seconds_to_hms(mut seconds: u32) -> (u32, u32, u32) {
    let mut minutes = seconds / 60;
    let hours = minutes / 60;
    seconds -= minutes * 60;
    minutes -= hours * 60;

    (hours, minutes, seconds)
}
