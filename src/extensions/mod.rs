pub mod degrees_ext;
