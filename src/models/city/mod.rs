//! Grid geometry and origin-destination demand.
pub mod city_grid;
pub mod city_model;
pub mod od_matrix;
