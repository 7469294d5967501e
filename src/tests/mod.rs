mod test_utils;

mod test_collision_space;
mod test_path_check;
