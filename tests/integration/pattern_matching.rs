use crate::lines;

#[test]
fn test_match_full_first_arm_wins() {
    let src = "set code 404\nmatch_full code\ncase_or 200 201 do\nprint \"ok\"\nend\n\
               case_or 404 410 do\nprint \"gone\"\nend\ncase 404 do\nprint \"never\"\nend\n\
               case _ do\nprint \"other\"\nend\nend";
    assert_eq!(lines(src), ["gone"]);
}

#[test]
fn test_match_full_string_subject() {
    let src = "str_create cmd \"stop\"\nmatch_full cmd\ncase \"go\" do\nprint 1\nend\n\
               case \"stop\" do\nprint 2\nend\nend";
    assert_eq!(lines(src), ["2"]);
}

#[test]
fn test_list_destructuring() {
    let src = "pack point 3 4\nmatch_full point\ncase_list 0 0 do\nprint \"origin\"\nend\n\
               case_list x y do\nmul x y\nprint x\nend\nend";
    assert_eq!(lines(src), ["12"]);
}

#[test]
fn test_dict_destructuring() {
    let src = "dict_create user\ndict_set user name \"Ada\"\ndict_set user role \"admin\"\n\
               match_full user\ncase_dict name:n role:r do\nprint n\nprint r\nend\nend";
    assert_eq!(lines(src), ["Ada", "admin"]);
}

#[test]
fn test_guard_match_in_loop() {
    let src = "pack scores 95 72 40\nforeach scores s do\nmatch s\ncase >= 90\nprint \"A\"\n\
               case >= 70\nprint \"C\"\ncase default\nprint \"F\"\nend\nend";
    assert_eq!(lines(src), ["A", "C", "F"]);
}
