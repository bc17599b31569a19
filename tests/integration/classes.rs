use crate::lines;

const SHAPES: &str = "class Shape\nfield name string \"shape\"\nfield sides int 0\n\
                      method describe do\nprint name\nprint sides\nend\n\
                      method area do\nreturn 0\nend\nend\n\
                      class Rect extends Shape\nfield w int 0\nfield h int 0\n\
                      init width height\nset w width\nset h height\nset sides 4\nend\n\
                      method area do\nset a w\nmul a h\nreturn a\nend\nend\n\
                      class Square extends Rect\nend\n";

#[test]
fn test_constructor_and_override() {
    let src = format!("{SHAPES}new Rect r 3 4\ncall r.area -> a\nprint a\ncall r.describe");
    assert_eq!(lines(&src), ["12", "shape", "4"]);
}

#[test]
fn test_constructor_inherited_two_levels() {
    let src = format!("{SHAPES}new Square s 5 5\ncall s.area -> a\nprint a\ninstanceof s Shape ok\nprint ok");
    assert_eq!(lines(&src), ["25", "1"]);
}

#[test]
fn test_base_class_method() {
    let src = format!("{SHAPES}new Shape s\ncall s.area -> a\nprint a");
    assert_eq!(lines(&src), ["0"]);
}

#[test]
fn test_fields_are_per_instance() {
    let src = format!(
        "{SHAPES}new Rect a 1 2\nnew Rect b 3 4\nset_field a w 10\nget_field a w\nget_field b w"
    );
    assert_eq!(lines(&src), ["10", "3"]);
}

#[test]
fn test_get_field_into_target() {
    let src = format!("{SHAPES}new Rect r 2 9\nget_field r h height\nadd height 1\nprint height");
    assert_eq!(lines(&src), ["10"]);
}

#[test]
fn test_method_errors_do_not_stop_program() {
    let src = format!("{SHAPES}new Rect r 1 1\ncall r.volume\nprint \"still running\"");
    assert_eq!(
        lines(&src),
        [
            "[Error: Method 'volume' is not defined for class 'Rect'.]",
            "still running"
        ]
    );
}

#[test]
fn test_structs() {
    let src = "struct Point x:int y:int end\nstruct new Point p\nstruct set p x 2\nstruct set p y 5\n\
               struct get p y py\nprint py\nstruct dump p";
    assert_eq!(lines(src), ["5", "Point{x: 2, y: 5}"]);
}

#[test]
fn test_method_calls_on_self_share_fields() {
    let src = "class C\nfield n int 0\nmethod inc do\nadd n 1\nend\n\
               method two do\ncall self.inc\ncall self.inc\nend\nend\n\
               new C c\ncall c.two\nget_field c n";
    assert_eq!(lines(src), ["2"]);
}

#[test]
fn test_set_field_on_undeclared_field() {
    let src = "class P\nfield x int 0\nend\nnew P p\nset_field p y 1\nget_field p x";
    assert_eq!(
        lines(src),
        ["[Error: Field 'y' does not exist on 'P'.]", "0"]
    );
}
