use serde_json::{json, Value};

fn random_unit() -> Result<f64, getrandom::Error> {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf)?;
    Ok((u64::from_le_bytes(buf) >> 11) as f64 / (1u64 << 53) as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Mock reading; swap in a real sensor driver on hardware.
fn read_temperature() -> Result<Value, getrandom::Error> {
    let celsius = round2(20.0 + (random_unit()? * 15.0 - 5.0));
    let fahrenheit = round2(celsius * 9.0 / 5.0 + 32.0);
    let humidity = round2(30.0 + random_unit()? * 40.0);

    Ok(json!({
        "temperature": {
            "celsius": celsius,
            "fahrenheit": fahrenheit,
        },
        "humidity": humidity,
        "unit": "celsius",
        "sensor": "mock",
    }))
}

fn main() {
    match read_temperature() {
        Ok(reading) => println!("{reading}"),
        Err(err) => {
            eprintln!("{}", json!({ "error": err.to_string() }));
            std::process::exit(1);
        }
    }
}
