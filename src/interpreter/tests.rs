use crate::interpreter::error::EvalError;
use crate::interpreter::Interpreter;

fn run(src: &str) -> Result<String, EvalError> { Interpreter::new().run(src) }

#[cfg(test)]
mod test_eval {
    use super::*;

    #[test]
    fn test_simple_forms() {
        let mut interpreter = Interpreter::new();
        let cases = [
            ("(null? '())", "#t"),
            ("(+ 1 2)", "3"),
            ("(+)", "0"),
            ("(*)", "1"),
            ("(- 3)", "-3"),
            ("(- 3 4)", "-1"),
            ("(< 1 2)", "#t"),
            ("(= 1 2)", "#f"),
            ("(number? (* 1 2))", "#t"),
            ("(pair? '(* 1 2))", "#t"),
            ("(cons 1 2)", "(1 . 2)"),
            ("(define l (list 1 2 'a 'b)) l", "(1 2 a b)"),
            ("(map number? '(1 2 a))", "(#t #t #f)"),
            ("(cond ((> 2 3) 'less)(else 'more))", "more"),
            ("(define my-pair (cons 1 2)) (set-car! my-pair 4) (set-cdr! my-pair 8) my-pair", "(4 . 8)"),
            ("(car l)", "1"),
            ("(cdr l)", "(2 a b)"),
            ("(define a (+ 4 5)) a", "9"),
        ];
        // one interpreter for all: `l` is used by later cases
        for (src, expected) in cases {
            assert_eq!(interpreter.run(src).unwrap(), expected, "{}", src);
        }
    }

    #[test]
    fn test_quoted_data_display() {
        assert_eq!(run("(quote (a . b))").unwrap(), "(a . b)");
        assert_eq!(run("(quote (1 2 3))").unwrap(), "(1 2 3)");
        assert_eq!(run("'(1 (2 . 3) \"s\" #\\x #t)").unwrap(), "(1 (2 . 3) \"s\" #\\x #t)");
        assert_eq!(run("'()").unwrap(), "()");
    }

    #[test]
    fn test_partition_with_named_let() {
        let src = "
            (let loop ((numbers '(3 -2 1 6 -5)) (nonneg '()) (neg '()))
                (cond ((null? numbers)
                         (list nonneg neg))
                      ((>= (car numbers) 0)
                         (loop (cdr numbers) (cons (car numbers) nonneg) neg))
                      (else (loop (cdr numbers) nonneg (cons (car numbers) neg)))))";
        assert_eq!(run(src).unwrap(), "((6 1 3) (-5 -2))");
    }

    #[test]
    fn test_exact_numbers() {
        assert_eq!(run("(+ 0.1 0.2)").unwrap(), "0.3");
        assert_eq!(run("(/ 10 4)").unwrap(), "2.5");
        assert_eq!(run("(* 1.5 2)").unwrap(), "3");
        assert_eq!(run("(/ 2 6)").unwrap(), "1/3");
        assert_eq!(run("(= (/ 1 2) 0.5)").unwrap(), "#t");
    }

    #[test]
    fn test_non_tail_recursion() {
        assert_eq!(run("(define (sum n) (if (= n 0) 0 (+ n (sum (- n 1))))) (sum 100)").unwrap(), "5050");
        assert_eq!(run("(define (down n) (if (= n 0) '() (cons n (down (- n 1))))) (down 3)").unwrap(), "(3 2 1)");
    }

    #[test]
    fn test_higher_order() {
        let src = "
            (define (compose f g) (lambda (x) (f (g x))))
            (define inc (lambda (x) (+ x 1)))
            (map (compose inc inc) '(1 2 3))";
        assert_eq!(run(src).unwrap(), "(3 4 5)");
        assert_eq!(run("(apply map list '((1 2) (3 4)))").unwrap(), "((1 3) (2 4))");
    }

    #[test]
    fn test_independent_interpreters() {
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();
        a.run("(define only-in-a 1)").unwrap();
        assert_eq!(a.run("only-in-a").unwrap(), "1");
        assert_eq!(b.run("only-in-a").unwrap_err(), EvalError::UnboundSymbol("only-in-a".into()));
    }
}

#[cfg(test)]
mod test_tail_calls {
    use super::*;

    const FIB: &str = "
        (define (fib n)
            (fib-iter 1 0 n))

        (define (fib-iter a b count)
            (if (= count 0) b (fib-iter (+ a b) a (- count 1))))

        (define is-even?
            (lambda (n) (if (= n 0) #t (is-odd? (- n 1)))))

        (define is-odd?
            (lambda (n) (if (= n 0) #f (is-even? (- n 1)))))";

    #[test]
    fn test_iterative_fib() {
        let mut interpreter = Interpreter::new();
        interpreter.run(FIB).unwrap();
        assert_eq!(interpreter.run("(fib 100)").unwrap(), "354224848179261915075");
        assert_eq!(interpreter.env.depth(), 1);
    }

    #[test]
    fn test_loop_building_car_nested_list() {
        let src = "(let loop ((i 0) (acc '())) (if (= i 30000) 'ok (loop (+ i 1) (cons acc i))))";
        assert_eq!(run(src).unwrap(), "ok");
        let nested = run("(let loop ((i 0) (acc '())) (if (= i 10000) acc (loop (+ i 1) (cons acc i))))").unwrap();
        assert!(nested.ends_with(" . 9998) . 9999)"));
    }

    #[test]
    fn test_mutual_recursion() {
        let mut interpreter = Interpreter::new();
        interpreter.run(FIB).unwrap();
        assert_eq!(interpreter.run("(is-even? 10000)").unwrap(), "#t");
        assert_eq!(interpreter.run("(is-odd? 10001)").unwrap(), "#t");
        assert_eq!(interpreter.run("(is-even? 10001)").unwrap(), "#f");
        assert_eq!(interpreter.env.depth(), 1);
    }

    #[test]
    fn test_long_named_let() {
        assert_eq!(run("(let loop ((i 0)) (if (< i 100000) (loop (+ i 1)) i))").unwrap(), "100000");
    }

    #[test]
    fn test_tail_position_through_cond_begin_and_or() {
        let src = "
            (define (count-down n)
                (cond ((= n 0) 'done)
                      (else (begin (and #t (or #f (count-down (- n 1))))))))
            (count-down 20000)";
        assert_eq!(run(src).unwrap(), "done");
    }

    #[test]
    fn test_let_inside_loop_body() {
        // a fresh `let` closure per iteration, still bounded
        let src = "
            (define (loop n acc)
                (let ((m (- n 1)))
                    (if (< m 0) acc (loop m (+ acc 1)))))
            (loop 20000 0)";
        assert_eq!(run(src).unwrap(), "20000");
    }

    #[test]
    fn test_non_tail_call_keeps_caller_frame() {
        // the inner (walk ...) runs in a new frame; `n` of the caller survives
        let src = "
            (define (walk n)
                (if (= n 0)
                    0
                    (let ((inner (walk (- n 1))))
                        (+ n inner))))
            (walk 10)";
        assert_eq!(run(src).unwrap(), "55");
    }
}

#[cfg(test)]
mod test_closures {
    use super::*;

    #[test]
    fn test_captured_arguments() {
        let src = "
            (define (make-adder n) (lambda (x) (+ x n)))
            (define add5 (make-adder 5))
            (define add7 (make-adder 7))
            (list (add5 10) (add7 10))";
        assert_eq!(run(src).unwrap(), "(15 17)");
    }

    #[test]
    fn test_snapshot_taken_at_creation() {
        assert_eq!(run("(define x 1) (define (get-x) x) (define x 2) (get-x)").unwrap(), "1");
    }

    #[test]
    fn test_names_defined_later_resolve_through_the_root() {
        assert_eq!(run("(define (f) later) (define later 42) (f)").unwrap(), "42");
    }

    #[test]
    fn test_each_iteration_captures_its_own_value() {
        let src = "
            (let loop ((i 0) (thunks '()))
                (if (= i 3)
                    (map (lambda (f) (f)) thunks)
                    (loop (+ i 1) (cons (lambda () i) thunks))))";
        assert_eq!(run(src).unwrap(), "(2 1 0)");
    }

    #[test]
    fn test_internal_define() {
        let src = "
            (define (outer)
                (define (helper n) (if (= n 0) 'ok (helper (- n 1))))
                (helper 5))
            (outer)";
        assert_eq!(run(src).unwrap(), "ok");
        assert_eq!(run("(define (outer) (define inner 1) inner) (outer) inner").unwrap_err(), EvalError::UnboundSymbol("inner".into()));
    }

    #[test]
    fn test_rest_parameters() {
        assert_eq!(run("((lambda (a . rest) rest) 1 2 3)").unwrap(), "(2 3)");
        assert_eq!(run("((lambda args args))").unwrap(), "()");
        assert_eq!(run("(define (f a b . c) (list a b c)) (f 1 2)").unwrap(), "(1 2 ())");
    }

    #[test]
    fn test_missing_argument_is_an_arity_error() {
        assert!(matches!(run("((lambda (a b) a) 1)"), Err(EvalError::Arity(_))));
        // surplus arguments are dropped
        assert_eq!(run("((lambda (a) a) 1 2 3)").unwrap(), "1");
    }

    #[test]
    fn test_named_let_closure_display() {
        assert_eq!(run("(let loop ((i 0)) loop)").unwrap(), "#<closure:loop>");
        assert_eq!(run("car").unwrap(), "#<procedure:car>");
    }
}

#[cfg(test)]
mod test_errors {
    use super::*;

    #[test]
    fn test_unbound_symbol_leaves_env_usable() {
        let mut interpreter = Interpreter::new();
        interpreter.run("(define kept 1)").unwrap();
        assert_eq!(interpreter.run("undefined-thing").unwrap_err(), EvalError::UnboundSymbol("undefined-thing".into()));
        assert_eq!(interpreter.run("(+ kept 2)").unwrap(), "3");
        assert_eq!(interpreter.env.depth(), 1);
    }

    #[test]
    fn test_failure_inside_closure_unwinds_frames() {
        let mut interpreter = Interpreter::new();
        assert!(matches!(interpreter.run("(define (bad x) (car x)) (bad 1)"), Err(EvalError::Type(_))));
        assert_eq!(interpreter.env.depth(), 1);
        assert_eq!(interpreter.run("(bad '(7))").unwrap(), "7");
    }

    #[test]
    fn test_execute_continues_after_failure() {
        let mut interpreter = Interpreter::new();
        let results = interpreter.execute("(define a 1) (car 5) (+ a 1)").unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Ok(String::new()));
        assert!(matches!(results[1], Err(EvalError::Type(_))));
        assert_eq!(results[2], Ok("2".to_string()));
    }

    #[test]
    fn test_syntax_error_aborts_before_evaluation() {
        let mut interpreter = Interpreter::new();
        assert!(matches!(interpreter.execute("(define a 1) (+ 1"), Err(EvalError::Syntax(_))));
        assert!(matches!(interpreter.run("a"), Err(EvalError::UnboundSymbol(_))));
    }

    #[test]
    fn test_side_effects_are_not_rolled_back() {
        let mut interpreter = Interpreter::new();
        interpreter.run("(define p (cons 1 2))").unwrap();
        assert!(interpreter.run("(begin (set-car! p 5) (car '()))").is_err());
        assert_eq!(interpreter.run("p").unwrap(), "(5 . 2)");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(run("(5 1)").unwrap_err().to_string(), "NotCallable: 5");
        assert_eq!(run("nope").unwrap_err().to_string(), "UnboundSymbol: nope");
        assert_eq!(run("(car 1)").unwrap_err().to_string(), "TypeError: Expected a pair, got 1");
        assert_eq!(run("(cons 1)").unwrap_err().kind(), "ArityError");
        assert_eq!(run("(if)").unwrap_err().kind(), "MalformedSpecialForm");
        assert_eq!(run("(/ 1 0)").unwrap_err().kind(), "DivisionByZero");
    }
}

#[cfg(test)]
mod test_output {
    use super::*;

    #[test]
    fn test_display_goes_to_current_output_port() {
        let mut interpreter = Interpreter::new();
        let out = interpreter.env.capture_output();
        let result = interpreter.run("(display \"hello\") (newline) (display '(1 \"a\"))").unwrap();
        assert_eq!(result, "");
        assert_eq!(out.borrow().as_str(), "hello\n(1 \"a\")");
    }

    #[test]
    fn test_display_inside_loop() {
        let mut interpreter = Interpreter::new();
        let out = interpreter.env.capture_output();
        interpreter.run("(let loop ((i 0)) (if (< i 3) (begin (display i) (loop (+ i 1)))))").unwrap();
        assert_eq!(out.borrow().as_str(), "012");
    }

    #[test]
    fn test_output_before_failure_is_kept() {
        let mut interpreter = Interpreter::new();
        let out = interpreter.env.capture_output();
        assert!(interpreter.run("(display 1) (error \"stop\") (display 2)").is_err());
        assert_eq!(out.borrow().as_str(), "1");
    }

    #[test]
    fn test_current_output_port_is_the_captured_buffer() {
        let mut interpreter = Interpreter::new();
        let out = interpreter.env.capture_output();
        interpreter.run("(display 'x (current-output-port))").unwrap();
        assert_eq!(out.borrow().as_str(), "x");
        assert_eq!(interpreter.run("(current-output-port)").unwrap(), "#<port:string>");
    }
}
