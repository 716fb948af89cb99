pub mod u501_file_import;
