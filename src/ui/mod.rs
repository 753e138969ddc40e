pub mod sprites;
