pub mod match_list;
pub mod points_table;
