mod narrowing_tests;
