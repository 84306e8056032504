//! Pickle streams captured from CPython for decoder tests.
//!
//! NumPy payloads use the reduce tuples NumPy emits for
//! `pickle.dumps(array, protocol=N)`.

/// `{"pred": float64 (3, 2) scores, "tgt": int64 [0, 1, 0]}`, protocol 4.
pub const NUMPY_SCORES_P4: &[u8] =
    b"\x80\x04\x95!\x01\x00\x00\x00\x00\x00\x00}\x94(\x8c\x04pred\x94\x8c\x15numpy.core.multiarray\x94\x8c\x0c_reconstruct\x94\x93\x94\x8c\x05numpy\x94\x8c\x07ndarray\x94\x93\x94K\x00\x85\x94C\x01b\x94\x87\x94R\x94(K\x01K\x03K\x02\x86\x94h\x05\x8c\x05dtype\x94\x93\x94\x8c\x02f8\x94\x89\x88\x87\x94R\x94(K\x03\x8c\x01<\x94NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94b\x89C0\xcd\xcc\xcc\xcc\xcc\xcc\xec?\x9a\x99\x99\x99\x99\x99\xb9?\x9a\x99\x99\x99\x99\x99\xc9?\x9a\x99\x99\x99\x99\x99\xe9?\x9a\x99\x99\x99\x99\x99\xd9?333333\xe3?\x94t\x94b\x8c\x03tgt\x94h\x04h\x07h\x08h\x09\x87\x94R\x94(K\x01K\x03\x85\x94h\x0e\x8c\x02i8\x94\x89\x88\x87\x94R\x94(K\x03h\x12NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94b\x89C\x18\x00\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x94t\x94bu.";

/// `{"pred": int64 [0, 1, 1, 2], "tgt": int64 [0, 1, 2, 2]}`, protocol 2 (`_codecs.encode` raw data).
pub const NUMPY_LABELS_P2: &[u8] =
    b"\x80\x02}q\x00(X\x04\x00\x00\x00predq\x01cnumpy.core.multiarray\x0a_reconstruct\x0aq\x02cnumpy\x0andarray\x0aq\x03K\x00\x85q\x04c_codecs\x0aencode\x0aq\x05X\x01\x00\x00\x00bq\x06X\x06\x00\x00\x00latin1q\x07\x86q\x08Rq\x09\x87q\x0aRq\x0b(K\x01K\x04\x85q\x0ccnumpy\x0adtype\x0aq\x0dX\x02\x00\x00\x00i8q\x0e\x89\x88\x87q\x0fRq\x10(K\x03X\x01\x00\x00\x00<q\x11NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00tq\x12b\x89h\x05X \x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\x00q\x13h\x07\x86q\x14Rq\x15tq\x16bX\x03\x00\x00\x00tgtq\x17h\x02h\x03h\x04h\x09\x87q\x18Rq\x19(K\x01h\x0ch\x0dh\x0e\x89\x88\x87q\x1aRq\x1b(K\x03h\x11NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00tq\x1cb\x89h\x05X \x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\x00q\x1dh\x07\x86q\x1eRq\x1ftq bu.";

/// Fortran-ordered int64 `[[1, 2, 3], [4, 5, 6]]` through `_frombuffer`, protocol 5.
pub const NUMPY_FORTRAN_P5: &[u8] =
    b"\x80\x05\x95\xa5\x00\x00\x00\x00\x00\x00\x00\x8c\x12numpy.core.numeric\x94\x8c\x0b_frombuffer\x94\x93\x94(\x960\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\x00\x05\x00\x00\x00\x00\x00\x00\x00\x03\x00\x00\x00\x00\x00\x00\x00\x06\x00\x00\x00\x00\x00\x00\x00\x94\x8c\x05numpy\x94\x8c\x05dtype\x94\x93\x94\x8c\x02i8\x94\x89\x88\x87\x94R\x94(K\x03\x8c\x01<\x94NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94bK\x02K\x03\x86\x94\x8c\x01F\x94t\x94R\x94.";

/// Fortran-ordered int64 `[[1, 2, 3], [4, 5, 6]]`, protocol 4.
pub const NUMPY_FORTRAN_P4: &[u8] =
    b"\x80\x04\x95\xba\x00\x00\x00\x00\x00\x00\x00\x8c\x15numpy.core.multiarray\x94\x8c\x0c_reconstruct\x94\x93\x94\x8c\x05numpy\x94\x8c\x07ndarray\x94\x93\x94K\x00\x85\x94C\x01b\x94\x87\x94R\x94(K\x01K\x02K\x03\x86\x94h\x03\x8c\x05dtype\x94\x93\x94\x8c\x02i8\x94\x89\x88\x87\x94R\x94(K\x03\x8c\x01<\x94NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94b\x88C0\x01\x00\x00\x00\x00\x00\x00\x00\x04\x00\x00\x00\x00\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\x00\x05\x00\x00\x00\x00\x00\x00\x00\x03\x00\x00\x00\x00\x00\x00\x00\x06\x00\x00\x00\x00\x00\x00\x00\x94t\x94b.";

/// Big-endian float32 `[1.5, -2.0]`.
pub const NUMPY_BIG_ENDIAN_F4: &[u8] =
    b"\x80\x04\x95\x90\x00\x00\x00\x00\x00\x00\x00\x8c\x15numpy.core.multiarray\x94\x8c\x0c_reconstruct\x94\x93\x94\x8c\x05numpy\x94\x8c\x07ndarray\x94\x93\x94K\x00\x85\x94C\x01b\x94\x87\x94R\x94(K\x01K\x02\x85\x94h\x03\x8c\x05dtype\x94\x93\x94\x8c\x02f4\x94\x89\x88\x87\x94R\x94(K\x03\x8c\x01>\x94NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94b\x89C\x08?\xc0\x00\x00\xc0\x00\x00\x00\x94t\x94b.";

/// Bool array `[True, False, True]`.
pub const NUMPY_BOOL: &[u8] =
    b"\x80\x04\x95\x8b\x00\x00\x00\x00\x00\x00\x00\x8c\x15numpy.core.multiarray\x94\x8c\x0c_reconstruct\x94\x93\x94\x8c\x05numpy\x94\x8c\x07ndarray\x94\x93\x94K\x00\x85\x94C\x01b\x94\x87\x94R\x94(K\x01K\x03\x85\x94h\x03\x8c\x05dtype\x94\x93\x94\x8c\x02b1\x94\x89\x88\x87\x94R\x94(K\x03\x8c\x01|\x94NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94b\x89C\x03\x01\x00\x01\x94t\x94b.";

/// One list object referenced by both `pred` and `tgt`.
pub const SHARED_LIST: &[u8] =
    b"\x80\x04\x95\x1c\x00\x00\x00\x00\x00\x00\x00}\x94(\x8c\x04pred\x94]\x94(K\x01K\x02e\x8c\x03tgt\x94h\x02u.";

/// `{"pred": [0, 1, 2], "tgt": [0, 1, 1]}`, protocol 0.
pub const DICT_P0: &[u8] =
    b"(dp0\x0aVpred\x0ap1\x0a(lp2\x0aI0\x0aaI1\x0aaI2\x0aasVtgt\x0ap3\x0a(lp4\x0aI0\x0aaI1\x0aaI1\x0aas.";

/// Nested float lists, a tuple, a 71-bit int and a negative int, protocol 2.
pub const DICT_P2: &[u8] =
    b"\x80\x02}q\x00(X\x04\x00\x00\x00predq\x01]q\x02(]q\x03(G?\xb9\x99\x99\x99\x99\x99\x9aG?\xec\xcc\xcc\xcc\xcc\xcc\xcde]q\x04(G?\xe6ffffffG?\xd3333333eeX\x03\x00\x00\x00tgtq\x05K\x01K\x00\x86q\x06X\x03\x00\x00\x00bigq\x07\x8a\x09\x00\x00\x00\x00\x00\x00\x00\x00@X\x03\x00\x00\x00negq\x08J\xfb\xff\xff\xffu.";

/// `{"pred": [0, 1, 2], "tgt": [0, 1, 1]}`, protocol 4.
pub const DICT_P4: &[u8] =
    b"\x80\x04\x95&\x00\x00\x00\x00\x00\x00\x00}\x94(\x8c\x04pred\x94]\x94(K\x00K\x01K\x02e\x8c\x03tgt\x94]\x94(K\x00K\x01K\x01eu.";

/// `[1, "x", None, True, 1.5, b"ab", {3}, frozenset()]`.
pub const MIXED_LIST_P4: &[u8] =
    b"\x80\x04\x95$\x00\x00\x00\x00\x00\x00\x00]\x94(K\x01\x8c\x01x\x94N\x88G?\xf8\x00\x00\x00\x00\x00\x00C\x02ab\x94\x8f\x94(K\x03\x90(\x91\x94e.";

/// `[1, 2, 3]`.
pub const NOT_A_DICT: &[u8] =
    b"\x80\x04\x95\x0b\x00\x00\x00\x00\x00\x00\x00]\x94(K\x01K\x02K\x03e.";

/// `{"pred": [1, 2]}`.
pub const MISSING_TARGET: &[u8] =
    b"\x80\x04\x95\x13\x00\x00\x00\x00\x00\x00\x00}\x94\x8c\x04pred\x94]\x94(K\x01K\x02es.";

/// `OrderedDict(pred=[1], tgt=[1])`, protocol 2.
pub const ORDERED_DICT_P2: &[u8] =
    b"\x80\x02ccollections\x0aOrderedDict\x0aq\x00)Rq\x01(X\x04\x00\x00\x00predq\x02]q\x03K\x01aX\x03\x00\x00\x00tgtq\x04]q\x05K\x01au.";
