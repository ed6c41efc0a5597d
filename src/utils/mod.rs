pub mod fs_size_calculator;
pub mod traits;

#[cfg(test)]
pub(crate) mod ram_disk;
#[cfg(test)]
pub(crate) mod test_image;
