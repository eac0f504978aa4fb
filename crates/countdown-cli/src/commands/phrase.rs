use countdown_core::seconds_to_phrase;

pub fn run(seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", seconds_to_phrase(seconds));
    Ok(())
}
