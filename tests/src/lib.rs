#[cfg(test)]
mod engine;
