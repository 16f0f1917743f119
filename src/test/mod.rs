pub mod file_utils_tests;
pub mod tensor_tests;
pub mod training_tests;
