pub mod alignment;
pub mod anchors;
pub mod annotation;
pub mod cigar;
pub mod classifier;
pub mod duplication;
pub mod facts;
pub mod intended;
pub mod outcome;
pub mod params;
pub mod read;
pub mod taxonomy;
pub mod writers;

#[cfg(test)]
pub mod test_fixtures;
