mod recurse_unit_test;
mod program_parser_unit_test;
