pub mod tidal;
