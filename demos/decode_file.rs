use parking_lot::Mutex;
use std::env;
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use nalflow::codec::h264::split_access_units;
use nalflow::Decoder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| "sample.h264".to_string());
    let data = tokio::fs::read(&path).await?;

    // Split the elementary stream on 00 00 00 01 and re-prefix each unit
    let units = split_access_units(&data);
    println!("{}: {} access units", path, units.len());

    let decoder = Decoder::new()?;

    let last_decode = Arc::new(Mutex::new(Instant::now()));
    decoder.on_frame(move |frame| {
        let mut last = last_decode.lock();
        let now = Instant::now();
        println!(
            "frame {}x{} ({} bytes), decode cost {:?}",
            frame.width,
            frame.height,
            frame.data.len(),
            now - *last
        );
        *last = now;
    });
    decoder.on_error(|err| eprintln!("decode error: {}", err));

    for unit in units {
        let len = unit.len();
        decoder.decode_frames(unit, 0, len)?;
    }

    decoder.wait_idle().await;
    println!("{:?}", decoder.stats());
    decoder.release();

    Ok(())
}
