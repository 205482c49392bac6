#[cfg(test)]
pub mod mock_chain;
