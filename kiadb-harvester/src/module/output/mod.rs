//! Input and output collaborators around the harvest pipeline

pub mod coordinates;
pub mod csv_sink;

pub use coordinates::{list_coordinate_files, load_area, parse_coordinates, AreaInput};
pub use csv_sink::CsvSink;
