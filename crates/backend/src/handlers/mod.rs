pub mod u501_imports;
