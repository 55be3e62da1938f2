pub mod city;
pub mod line;
