mod proptest_decode;
